//! Image Serving Tests
//!
//! Tests for raw image and multipart image requests, and image responses.

use crate::*;
use tensorserve_image::read_image;
use tensorserve_wire::{parse_multipart, MediaType, MultipartWriter};

fn multipart_request(parts: &[(&str, Vec<u8>)]) -> ServingRequest {
    let mut writer = MultipartWriter::new();
    for (i, (name, bytes)) in parts.iter().enumerate() {
        writer.add_part(name, &format!("{}{}.png", name, i), "image/png", bytes);
    }
    let content_type = format!("multipart/form-data; boundary={}", writer.boundary());
    ServingRequest::new(writer.finish()).content_type(content_type)
}

// =============================================================================
// RAW IMAGES
// =============================================================================

#[test]
fn test_png_in_png_out() {
    let service = invert_service();
    let request = ServingRequest::new(png(3, 2, [10, 20, 30]))
        .content_type("image/png")
        .accept("image/png");
    let body = evaluate(&service, request);
    assert_eq!(body.media_type, "image/png");

    let image = read_image(&body.bytes).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (3, 2));
    assert_eq!(image.get_pixel(2, 1).0, [245, 235, 225]);
    assert_eq!(service.evaluation_count(), 1);
}

#[test]
fn test_any_image_accept_is_png() {
    let service = invert_service();
    let request = ServingRequest::new(png(2, 2, [0, 0, 0]))
        .content_type("image/png")
        .accept("image/*");
    assert_eq!(evaluate(&service, request).media_type, "image/png");
}

#[test]
fn test_jpeg_response() {
    let service = invert_service();
    let request = ServingRequest::new(png(4, 4, [0, 0, 0]))
        .content_type("image/png")
        .accept("image/jpeg");
    let body = evaluate(&service, request);
    assert_eq!(body.media_type, "image/jpeg");
    let image = read_image(&body.bytes).unwrap().to_rgb8();
    assert!(image.pixels().all(|p| p.0.iter().all(|v| *v > 240)));
}

#[test]
fn test_configured_size_resizes_input() {
    let mut config = invert_config();
    config.image.expected_width = Some(2);
    config.image.expected_height = Some(3);
    let service = EvaluationService::with_backend(Invert, config).unwrap();

    let request = ServingRequest::new(png(8, 8, [100, 100, 100]))
        .content_type("image/png")
        .accept("image/png");
    let image = read_image(&evaluate(&service, request).bytes).unwrap();
    assert_eq!((image.width(), image.height()), (2, 3));
}

// =============================================================================
// MULTIPART IMAGES
// =============================================================================

#[test]
fn test_multipart_batch_of_images() {
    let service = invert_service();
    let request = multipart_request(&[
        ("image", png(2, 2, [255, 0, 0])),
        ("image", png(2, 2, [0, 255, 0])),
    ])
    .accept("multipart/form-data");
    let body = evaluate(&service, request);
    assert_eq!(service.evaluation_count(), 2);

    let media_type = MediaType::parse(&body.media_type).unwrap();
    let parts = parse_multipart(&body.bytes, media_type.param("boundary").unwrap()).unwrap();
    assert_eq!(parts.len(), 2);
    assert!(parts.iter().all(|p| p.name == "inverted"));
    assert_eq!(parts[0].filename.as_deref(), Some("inverted.png"));

    let first = read_image(&parts[0].body).unwrap().to_rgb8();
    let second = read_image(&parts[1].body).unwrap().to_rgb8();
    assert_eq!(first.get_pixel(0, 0).0, [0, 255, 255]);
    assert_eq!(second.get_pixel(1, 1).0, [255, 0, 255]);
}

#[test]
fn test_batch_cannot_become_one_image() {
    let service = invert_service();
    let request = multipart_request(&[
        ("image", png(2, 2, [1, 1, 1])),
        ("image", png(2, 2, [2, 2, 2])),
    ])
    .accept("image/png");
    let err = evaluate_err(&service, request);
    assert_eq!(err.code(), "ImageError");
    assert!(err.to_string().contains("a batch of 2 images"));
}

#[test]
fn test_images_of_different_sizes_are_rejected() {
    let service = invert_service();
    let request = multipart_request(&[
        ("image", png(2, 2, [1, 1, 1])),
        ("image", png(4, 2, [2, 2, 2])),
    ]);
    let err = evaluate_err(&service, request);
    assert_eq!(err.code(), "ImageError");
    assert!(err.is_client_error());
}

#[test]
fn test_html_inlines_images() {
    let service = invert_service();
    let request = ServingRequest::new(png(2, 2, [9, 9, 9]))
        .content_type("image/png")
        .accept("text/html");
    let page = String::from_utf8(evaluate(&service, request).bytes).unwrap();
    assert!(page.starts_with("<h1>inverted</h1><img id=\"ItemPreview\" src=\"data:image/png;base64,"));
}

#[test]
fn test_multipart_part_type_override() {
    let service = invert_service();
    let request = ServingRequest::new(png(2, 2, [0, 0, 0]))
        .content_type("image/png")
        .accept("multipart/form-data; inverted=application/json");
    let body = evaluate(&service, request);
    let media_type = MediaType::parse(&body.media_type).unwrap();
    let parts = parse_multipart(&body.bytes, media_type.param("boundary").unwrap()).unwrap();
    assert_eq!(parts[0].filename.as_deref(), Some("inverted.json"));
    let values: serde_json::Value = serde_json::from_slice(&parts[0].body).unwrap();
    assert_eq!(values[0][0], serde_json::json!([255, 255, 255]));
}
