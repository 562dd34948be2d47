use tracing::{debug, info};

use super::{EncodingSource, ExtractedImage, StructureEncoding};

/// 无法给出可信结构时的哨兵编码（SMILES 通配原子）
pub const PLACEHOLDER_SENTINEL: &str = "*";

/// 占位识别器的固定输出域，对接真实识别器前的模拟SMILES
const MOCK_SMILES: &[&str] = &["c1ccccc1", "CCO", "CC(=O)O", "c1ccc2ccccc2c1", "CC(C)O"];

/// 化学结构识别能力。真实的光学结构识别器（DECIMER一类）
/// 可以替换默认的占位实现，接口不变。
pub trait StructureRecognizer: Send + Sync {
    fn recognize(&self, image: &ExtractedImage) -> StructureEncoding;
}

/// 占位识别器：不做真实识别，输出确定性的占位编码
pub struct StubStructureRecognizer {
    min_structure_px: u32,
}

impl StubStructureRecognizer {
    pub fn new(min_structure_px: u32) -> Self {
        Self { min_structure_px }
    }
}

impl StructureRecognizer for StubStructureRecognizer {
    fn recognize(&self, image: &ExtractedImage) -> StructureEncoding {
        let decoded = image::load_from_memory(&image.data).ok();
        let (width, height) = match &decoded {
            Some(img) => (img.width(), img.height()),
            None => (image.width, image.height),
        };

        // 解码失败或尺寸过小的图片不可能是结构图，给出哨兵
        if decoded.is_none() || width < self.min_structure_px || height < self.min_structure_px {
            debug!(
                "图片不满足结构图条件: {}x{} ({}, page {})",
                width, height, image.format, image.page
            );
            return StructureEncoding {
                smiles: PLACEHOLDER_SENTINEL.to_string(),
                page: image.page,
                source: EncodingSource::Placeholder,
            };
        }

        // 内容字节决定输出，同一张图片永远得到同一个编码
        let key = image
            .data
            .iter()
            .fold(image.data.len(), |acc, b| acc.wrapping_add(*b as usize));
        StructureEncoding {
            smiles: MOCK_SMILES[key % MOCK_SMILES.len()].to_string(),
            page: image.page,
            source: EncodingSource::Placeholder,
        }
    }
}

pub struct StructureConverter {
    recognizer: Box<dyn StructureRecognizer>,
}

impl StructureConverter {
    pub fn new(min_structure_px: u32) -> Self {
        Self {
            recognizer: Box::new(StubStructureRecognizer::new(min_structure_px)),
        }
    }

    pub fn with_recognizer(recognizer: Box<dyn StructureRecognizer>) -> Self {
        Self { recognizer }
    }

    /// 逐张转换，输出数量与输入一一对应，顺序不变
    pub fn convert(&self, images: &[ExtractedImage]) -> Vec<StructureEncoding> {
        let encodings: Vec<StructureEncoding> = images
            .iter()
            .map(|image| self.recognizer.recognize(image))
            .collect();
        info!("结构图转换完成，共 {} 个编码", encodings.len());
        encodings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// 生成指定尺寸的纯色PNG
    fn png_image(page: usize, width: u32, height: u32, shade: u8) -> ExtractedImage {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([shade, shade, shade]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        ExtractedImage {
            page,
            data: buf.into_inner(),
            width,
            height,
            format: "png".to_string(),
        }
    }

    fn garbage_image(page: usize) -> ExtractedImage {
        ExtractedImage {
            page,
            data: vec![0xde, 0xad, 0xbe, 0xef],
            width: 200,
            height: 200,
            format: "jp2".to_string(),
        }
    }

    #[test]
    fn test_one_encoding_per_image() {
        let converter = StructureConverter::new(50);
        let images = vec![
            png_image(1, 100, 100, 10),
            garbage_image(1),
            png_image(2, 20, 20, 30),
            png_image(3, 80, 120, 200),
        ];
        let encodings = converter.convert(&images);
        assert_eq!(encodings.len(), images.len());
        // 顺序与输入一致
        let pages: Vec<usize> = encodings.iter().map(|e| e.page).collect();
        assert_eq!(pages, vec![1, 1, 2, 3]);
    }

    #[test]
    fn test_undecodable_and_tiny_images_get_sentinel() {
        let converter = StructureConverter::new(50);
        let encodings = converter.convert(&[garbage_image(1), png_image(1, 20, 20, 0)]);
        assert!(encodings.iter().all(|e| e.smiles == PLACEHOLDER_SENTINEL));
    }

    #[test]
    fn test_stub_output_is_deterministic_and_tagged() {
        let converter = StructureConverter::new(50);
        let image = png_image(1, 100, 100, 77);
        let first = converter.convert(std::slice::from_ref(&image));
        let second = converter.convert(std::slice::from_ref(&image));
        assert_eq!(first, second);
        assert_eq!(first[0].source, EncodingSource::Placeholder);
        assert!(MOCK_SMILES.contains(&first[0].smiles.as_str()));
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let converter = StructureConverter::new(50);
        assert!(converter.convert(&[]).is_empty());
    }
}
