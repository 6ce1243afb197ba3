use super::{part_encoding, EncodedBody, PartEncoding};
use crate::media_type::{Accept, MediaType, HTML};
use base64::Engine;
use tensorserve_core::{Builder, Result, TensorCollection, TensorField};
use tensorserve_image::write_image;

/// Escape text for HTML content and attribute values
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            c => result.push(c),
        }
    }
    result
}

/// Encode `output` as an HTML page, one heading per tensor.
///
/// Images are inlined as data URIs. Scalars become a paragraph, vectors a
/// list and anything of higher rank a JSON code block.
pub fn encode_html(
    output: &TensorCollection,
    accept: &Accept,
    fields: &[TensorField],
    simplify: bool,
) -> Result<EncodedBody> {
    let mut html = String::new();
    for (name, tensor) in output.iter() {
        html.push_str(&format!("<h1>{}</h1>", escape_html(name)));
        match part_encoding(name, tensor, accept, fields)? {
            PartEncoding::Image(format, layout) => {
                for image in layout.image_builder().build(tensor)? {
                    let content = write_image(&image, format)?;
                    let data = base64::engine::general_purpose::STANDARD.encode(&content.bytes);
                    html.push_str(&format!(
                        "<img id=\"ItemPreview\" src=\"data:{};base64,{}\">",
                        content.media_type, data
                    ));
                }
            }
            PartEncoding::Json => {
                let tensor = if simplify {
                    tensor.clone().squeeze()?
                } else {
                    tensor.clone()
                };
                match tensor.rank() {
                    0 => html.push_str(&format!("<p>{}</p>", escape_html(&tensor.element(0).to_string()))),
                    1 => {
                        html.push_str("<ul>");
                        for element in tensor.elements() {
                            html.push_str(&format!("<li>{}</li>", escape_html(&element.to_string())));
                        }
                        html.push_str("</ul>");
                    }
                    _ => html.push_str(&format!(
                        "<code>{}</code>",
                        escape_html(&tensor.to_json(false).to_string())
                    )),
                }
            }
        }
    }

    Ok(EncodedBody {
        media_type: MediaType::new(HTML).with_param("charset", "UTF-8").to_string(),
        bytes: html.into_bytes(),
    })
}
