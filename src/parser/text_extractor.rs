use std::collections::HashMap;
use std::io::{Cursor, Read as IoRead};

use lopdf::{Dictionary, Document, ObjectId};
use tracing::{debug, info, warn};

use super::{ExtractedImage, ExtractionResult};
use crate::utils::AnalyzeError;

pub struct TextExtractor {
    max_file_size: usize,
}

impl TextExtractor {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    /// 从PDF字节流中提取各页文本与嵌入图片
    pub fn extract(&self, data: &[u8]) -> Result<ExtractionResult, AnalyzeError> {
        // 大小检查必须发生在任何解析动作之前
        if data.len() > self.max_file_size {
            return Err(AnalyzeError::TooLarge {
                size: data.len(),
                limit: self.max_file_size,
            });
        }

        let doc = match Document::load_mem(data) {
            Ok(doc) => doc,
            Err(e) => {
                let msg = e.to_string();
                if msg.to_ascii_lowercase().contains("encrypt") {
                    return Err(AnalyzeError::Encrypted);
                }
                return Err(AnalyzeError::Corrupt(msg));
            }
        };

        if doc.is_encrypted() {
            return Err(AnalyzeError::Encrypted);
        }

        let mut result = ExtractionResult::default();
        self.extract_text(data, &doc, &mut result)?;
        self.extract_images(&doc, &mut result);

        info!(
            "提取完成: {} 页文本, {} 张图片, {} 条警告",
            result.pages.len(),
            result.images.len(),
            result.warnings.len()
        );
        Ok(result)
    }

    /// 逐页提取文本，单页失败记录警告后跳过；全部失败时整体退回 pdf-extract
    fn extract_text(
        &self,
        data: &[u8],
        doc: &Document,
        result: &mut ExtractionResult,
    ) -> Result<(), AnalyzeError> {
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(AnalyzeError::Corrupt("文档中没有可解析的页面".to_string()));
        }

        let mut pages: Vec<String> = Vec::with_capacity(page_numbers.len());
        let mut failed = 0usize;
        for page_no in &page_numbers {
            match doc.extract_text(&[*page_no]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    failed += 1;
                    let msg = format!("第 {} 页文本提取失败: {}", page_no, e);
                    warn!("{}", msg);
                    result.warnings.push(msg);
                    // 占位空页，保持页码与原文档一致
                    pages.push(String::new());
                }
            }
        }

        if failed == page_numbers.len() {
            // lopdf 的文本提取有时会整体失败，退回 pdf-extract 再试一次
            match pdf_extract::extract_text_from_mem(data) {
                Ok(text) if !text.trim().is_empty() => {
                    result
                        .warnings
                        .push("逐页提取失败，使用整体提取结果".to_string());
                    result.pages = text.split('\x0c').map(|s| s.to_string()).collect();
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => warn!("pdf-extract 提取失败: {}", e),
            }
            return Err(AnalyzeError::Corrupt("所有页面均无法提取文本".to_string()));
        }

        result.pages = pages;
        Ok(())
    }

    /// 扫描文档对象，提取 Subtype=Image 的流对象
    fn extract_images(&self, doc: &Document, result: &mut ExtractionResult) {
        let image_ids = collect_image_ids(doc);
        debug!("PDF中发现 {} 个Image对象", image_ids.len());

        for (obj_id, page_hint) in image_ids {
            let stream = match doc.get_object(obj_id).and_then(|o| o.as_stream()) {
                Ok(s) => s,
                Err(_) => continue,
            };

            let width = dict_i64(&stream.dict, b"Width").unwrap_or(0) as u32;
            let height = dict_i64(&stream.dict, b"Height").unwrap_or(0) as u32;

            // 跳过明显是图标/项目符号的小图
            if width < 10 || height < 10 {
                debug!("跳过小图片: {}x{} (obj {:?})", width, height, obj_id);
                continue;
            }

            match get_filter_name(&stream.dict).as_deref() {
                Some("DCTDecode") => {
                    // JPEG 数据原样保留
                    let data = stream
                        .decompressed_content()
                        .unwrap_or_else(|_| stream.content.clone());
                    if data.is_empty() {
                        continue;
                    }
                    result.images.push(ExtractedImage {
                        page: page_hint,
                        data,
                        width,
                        height,
                        format: "jpeg".to_string(),
                    });
                }
                Some("FlateDecode") | None => {
                    // 无 Filter 时 content 本身就是裸像素
                    let data = if stream.dict.get(b"Filter").is_ok() {
                        match stream.decompressed_content() {
                            Ok(d) => d,
                            Err(_) => match manual_inflate(&stream.content) {
                                Ok(d) => d,
                                Err(e) => {
                                    let msg = format!("图片流解压失败 (obj {:?}): {}", obj_id, e);
                                    warn!("{}", msg);
                                    result.warnings.push(msg);
                                    continue;
                                }
                            },
                        }
                    } else {
                        stream.content.clone()
                    };
                    match encode_raw_pixels(&stream.dict, doc, &data, width, height) {
                        Some(png) => result.images.push(ExtractedImage {
                            page: page_hint,
                            data: png,
                            width,
                            height,
                            format: "png".to_string(),
                        }),
                        None => {
                            warn!("无法重建图片像素 (obj {:?}, {}x{})", obj_id, width, height);
                        }
                    }
                }
                other => {
                    // 其他编码原样保留，由结构识别阶段决定能否使用
                    if stream.content.is_empty() {
                        continue;
                    }
                    let format = other
                        .map(|f| f.to_ascii_lowercase())
                        .unwrap_or_else(|| "raw".to_string());
                    debug!("保留未解码图片: {} (obj {:?})", format, obj_id);
                    result.images.push(ExtractedImage {
                        page: page_hint,
                        data: stream.content.clone(),
                        width,
                        height,
                        format,
                    });
                }
            }
        }
    }
}

/// 遍历文档对象，找出 Subtype=Image 的流对象并尽量标注所属页码
fn collect_image_ids(doc: &Document) -> Vec<(ObjectId, usize)> {
    // 先建立 XObject引用 -> 页码 的映射
    let mut page_of: HashMap<ObjectId, usize> = HashMap::new();
    for (page_no, page_id) in doc.get_pages() {
        if let Some(xobjects) = page_xobjects(doc, page_id) {
            for (_, value) in xobjects.iter() {
                if let Ok(ref_id) = value.as_reference() {
                    page_of.entry(ref_id).or_insert(page_no as usize);
                }
            }
        }
    }

    let mut image_ids: Vec<(ObjectId, usize)> = Vec::new();
    for (&obj_id, object) in doc.objects.iter() {
        let stream = match object.as_stream() {
            Ok(s) => s,
            Err(_) => continue,
        };

        let subtype = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|s| s.as_name().ok())
            .and_then(|n| std::str::from_utf8(n).ok());

        if subtype == Some("Image") {
            let page = page_of.get(&obj_id).copied().unwrap_or(0);
            image_ids.push((obj_id, page));
        }
    }

    // 按页码排序，保证输出顺序稳定
    image_ids.sort_by_key(|&(id, page)| (page, id));
    image_ids
}

/// 获取页面 Resources 中的 XObject 字典
fn page_xobjects(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let page = doc.get_object(page_id).ok()?.as_dict().ok()?;
    let (_, resources) = doc.dereference(page.get(b"Resources").ok()?).ok()?;
    let resources = resources.as_dict().ok()?;
    let (_, xobjects) = doc.dereference(resources.get(b"XObject").ok()?).ok()?;
    xobjects.as_dict().ok()
}

fn dict_i64(dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key).ok().and_then(|v| v.as_i64().ok())
}

/// 获取 Filter 名称，处理 Name 和 Array 两种格式
fn get_filter_name(dict: &Dictionary) -> Option<String> {
    let filter_obj = dict.get(b"Filter").ok()?;

    if let Ok(name_bytes) = filter_obj.as_name() {
        return std::str::from_utf8(name_bytes).ok().map(|s| s.to_string());
    }

    // Array 格式 (如 [/ASCII85Decode /FlateDecode])，优先取图像编码
    if let Ok(arr) = filter_obj.as_array() {
        for item in arr.iter().rev() {
            if let Ok(name_bytes) = item.as_name() {
                if let Ok(name) = std::str::from_utf8(name_bytes) {
                    if matches!(name, "DCTDecode" | "JPXDecode" | "CCITTFaxDecode") {
                        return Some(name.to_string());
                    }
                }
            }
        }
        if let Some(first) = arr.first() {
            if let Ok(name_bytes) = first.as_name() {
                return std::str::from_utf8(name_bytes).ok().map(|s| s.to_string());
            }
        }
    }

    None
}

/// 将裸像素数据编码为PNG字节
fn encode_raw_pixels(
    dict: &Dictionary,
    doc: &Document,
    data: &[u8],
    width: u32,
    height: u32,
) -> Option<Vec<u8>> {
    let channels = color_channels(dict, doc);
    let bits = dict_i64(dict, b"BitsPerComponent").unwrap_or(8) as u32;
    if bits != 8 {
        return None;
    }

    let expected = width as usize * height as usize * channels as usize;
    if data.len() < expected {
        return None;
    }

    let pixels = data[..expected].to_vec();
    let img = match channels {
        1 => image::GrayImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageLuma8),
        3 => image::RgbImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageRgb8),
        4 => {
            image::RgbaImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageRgba8)
        }
        _ => None,
    }?;

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).ok()?;
    Some(buf.into_inner())
}

/// 获取颜色通道数
fn color_channels(dict: &Dictionary, doc: &Document) -> u32 {
    let cs_obj = match dict.get(b"ColorSpace") {
        Ok(obj) => obj,
        Err(_) => return 3,
    };

    if let Ok(name_bytes) = cs_obj.as_name() {
        return channels_from_name(std::str::from_utf8(name_bytes).unwrap_or(""));
    }

    if let Ok(arr) = cs_obj.as_array() {
        if let Some(first) = arr.first() {
            if let Ok(name_bytes) = first.as_name() {
                let name = std::str::from_utf8(name_bytes).unwrap_or("");
                match name {
                    "ICCBased" => {
                        if let Some(n) = arr
                            .get(1)
                            .and_then(|r| r.as_reference().ok())
                            .and_then(|id| doc.get_object(id).ok())
                            .and_then(|o| o.as_stream().ok())
                            .and_then(|s| dict_i64(&s.dict, b"N"))
                        {
                            return n as u32;
                        }
                        return 3;
                    }
                    "Indexed" | "CalRGB" | "Lab" => return 3,
                    "CalGray" => return 1,
                    _ => return channels_from_name(name),
                }
            }
        }
    }

    if let Ok(ref_id) = cs_obj.as_reference() {
        if let Ok(resolved) = doc.get_object(ref_id) {
            if let Ok(name_bytes) = resolved.as_name() {
                return channels_from_name(std::str::from_utf8(name_bytes).unwrap_or(""));
            }
        }
    }

    3
}

fn channels_from_name(name: &str) -> u32 {
    match name {
        "DeviceGray" | "CalGray" | "G" => 1,
        "DeviceRGB" | "CalRGB" | "RGB" => 3,
        "DeviceCMYK" | "CMYK" => 4,
        _ => 3,
    }
}

/// lopdf 解压失败时手动使用 flate2 解压（先zlib后raw deflate）
fn manual_inflate(compressed: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(compressed);
    let mut result = Vec::new();
    if decoder.read_to_end(&mut result).is_ok() {
        return Ok(result);
    }

    let mut decoder = flate2::read::DeflateDecoder::new(compressed);
    result.clear();
    decoder.read_to_end(&mut result)?;
    Ok(result)
}

/// 测试用的内存PDF构建工具
#[cfg(test)]
pub mod test_pdf {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// 生成一份简单的多页PDF，每个元素对应一页文本
    pub fn sample_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![50.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    /// 生成一页含嵌入图片的PDF，图片为指定尺寸的纯色RGB
    pub fn image_pdf(text: &str, width: u32, height: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let rgb: Vec<u8> = std::iter::repeat([120u8, 40, 200])
            .take((width * height) as usize)
            .flatten()
            .collect();
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb,
        ));

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => dictionary! { "Im1" => image_id },
        });

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![200.into(), 0.into(), 0.into(), 200.into(), 50.into(), 400.into()],
                ),
                Operation::new("Do", vec!["Im1".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    /// 生成带 Encrypt 字典的PDF，用于加密检测测试
    pub fn encrypted_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let encrypt_id = doc.add_object(dictionary! {
            "Filter" => "Standard",
            "V" => 1,
            "R" => 2,
        });
        doc.trailer.set("Encrypt", encrypt_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}
