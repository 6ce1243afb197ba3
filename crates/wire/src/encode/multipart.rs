use super::{part_encoding, EncodedBody, PartEncoding};
use crate::media_type::{Accept, MediaType, JSON, MULTIPART};
use crate::multipart::MultipartWriter;
use tensorserve_core::{Builder, Result, TensorCollection, TensorField};
use tensorserve_image::write_image;

/// Encode `output` as a multipart form with one part per tensor.
///
/// Image tensors holding a batch give one part per image, all under the
/// tensor name.
pub fn encode_multipart(
    output: &TensorCollection,
    accept: &Accept,
    fields: &[TensorField],
    simplify: bool,
) -> Result<EncodedBody> {
    let mut writer = MultipartWriter::new();
    for (name, tensor) in output.iter() {
        match part_encoding(name, tensor, accept, fields)? {
            PartEncoding::Image(format, layout) => {
                for image in layout.image_builder().build(tensor)? {
                    let content = write_image(&image, format)?;
                    let filename = format!("{}.{}", name, content.extension);
                    writer.add_part(name, &filename, content.media_type, &content.bytes);
                }
            }
            PartEncoding::Json => {
                let body = tensor.to_json(simplify).to_string();
                writer.add_part(name, &format!("{}.json", name), JSON, body.as_bytes());
            }
        }
    }

    let media_type = MediaType::new(MULTIPART)
        .with_param("charset", "UTF-8")
        .with_param("boundary", writer.boundary());
    Ok(EncodedBody {
        media_type: media_type.to_string(),
        bytes: writer.finish(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::parse_multipart;
    use tensorserve_core::Tensor;
    use tensorserve_image::{read_image, ImageFormat};

    fn output() -> TensorCollection {
        let mut output = TensorCollection::new();
        output.insert("label", Tensor::scalar("cat"));
        output.insert(
            "mask",
            Tensor::from_vec(vec![1, 2, 2, 1], vec![0i32, 255, 255, 0]).unwrap(),
        );
        output
    }

    fn boundary(media_type: &str) -> String {
        MediaType::parse(media_type).unwrap().param("boundary").unwrap().to_string()
    }

    #[test]
    fn test_parts_per_tensor() {
        let body = encode_multipart(&output(), &Accept::parse(Some("multipart/form-data")).unwrap(), &[], true)
            .unwrap();
        assert!(body.media_type.starts_with("multipart/form-data; charset=UTF-8; boundary="));

        let parts = parse_multipart(&body.bytes, &boundary(&body.media_type)).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name, "label");
        assert_eq!(parts[0].filename.as_deref(), Some("label.json"));
        assert_eq!(parts[0].body, b"\"cat\"");
        assert_eq!(parts[1].filename.as_deref(), Some("mask.png"));
        assert_eq!(parts[1].content_type.as_ref().unwrap().essence(), "image/png");
        let mask = read_image(&parts[1].body).unwrap().to_luma8();
        assert_eq!(mask.get_pixel(1, 0).0, [255]);
    }

    #[test]
    fn test_requested_part_types() {
        let accept = Accept::parse(Some("multipart/form-data; mask=image/jpeg")).unwrap();
        let body = encode_multipart(&output(), &accept, &[], true).unwrap();
        let parts = parse_multipart(&body.bytes, &boundary(&body.media_type)).unwrap();
        assert_eq!(parts[1].filename.as_deref(), Some("mask.jpg"));
        assert_eq!(ImageFormat::sniff(&parts[1].body), Some(ImageFormat::Jpeg));

        let accept = Accept::parse(Some("multipart/form-data; mask=application/json")).unwrap();
        let body = encode_multipart(&output(), &accept, &[], false).unwrap();
        let parts = parse_multipart(&body.bytes, &boundary(&body.media_type)).unwrap();
        assert_eq!(parts[1].body, b"[[[[0],[255]],[[255],[0]]]]");
    }
}
