use super::*;

fn png_handle(image: &RgbaImage) -> ImageHandle {
    ImageHandle::new("photo.png", "image/png", encode_png(image).expect("encode"))
}

fn decode_rgba(handle: &ImageHandle) -> RgbaImage {
    image::load_from_memory(handle.bytes())
        .expect("decode")
        .to_rgba8()
}

#[test]
fn grayscale_averages_rgb_and_keeps_alpha() {
    let mut source = RgbaImage::new(2, 1);
    source.put_pixel(0, 0, image::Rgba([30, 60, 90, 255]));
    source.put_pixel(1, 0, image::Rgba([255, 0, 1, 17]));

    let result = grayscale(&png_handle(&source)).expect("grayscale");
    let out = decode_rgba(&result);

    assert_eq!(out.get_pixel(0, 0).0, [60, 60, 60, 255]);
    // 256 / 3 = 85.33, rounds down
    assert_eq!(out.get_pixel(1, 0).0, [85, 85, 85, 17]);
    assert_eq!(result.mime(), "image/png");
    assert_eq!(result.name(), "photo.png");
}

#[test]
fn average_rounds_to_nearest() {
    let mut raster = RgbaImage::from_pixel(1, 1, image::Rgba([1, 1, 0, 255]));
    average_channels(&mut raster);
    // 2 / 3 = 0.67
    assert_eq!(raster.get_pixel(0, 0).0, [1, 1, 1, 255]);
}

#[test]
fn rotate_swaps_dimensions_and_turns_clockwise() {
    let mut source = RgbaImage::from_pixel(3, 2, image::Rgba([0, 0, 0, 255]));
    source.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));

    let rotated = rotate_clockwise(&png_handle(&source)).expect("rotate");
    let out = decode_rgba(&rotated);

    assert_eq!((out.width(), out.height()), (2, 3));
    // top-left moves to top-right under a clockwise quarter turn
    assert_eq!(out.get_pixel(1, 0).0, [255, 0, 0, 255]);
    assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
}

#[test]
fn four_rotations_restore_original_pixels() {
    let source = RgbaImage::from_fn(5, 3, |x, y| image::Rgba([x as u8 * 40, y as u8 * 60, 7, 255]));
    let mut handle = png_handle(&source);
    for _ in 0..4 {
        handle = TransformKind::Rotate.apply(&handle).expect("rotate");
    }
    assert_eq!(decode_rgba(&handle), source);
}

#[test]
fn jpeg_source_stays_jpeg() {
    let source = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 100, 50]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(source)
        .write_to(&mut bytes, ImageFormat::Jpeg)
        .expect("jpeg");
    let handle = ImageHandle::new("photo.jpg", "image/jpeg", bytes.into_inner());

    let result = grayscale(&handle).expect("grayscale");
    assert_eq!(result.mime(), "image/jpeg");
    assert_eq!(dimensions(&result), Some((4, 4)));
}

#[test]
fn undecodable_bytes_fail_with_decode_error() {
    let handle = ImageHandle::new("broken.png", "image/png", vec![0x89, 0x50, 0x00]);
    assert!(matches!(grayscale(&handle), Err(TransformError::Decode(_))));
    assert!(matches!(
        rotate_clockwise(&handle),
        Err(TransformError::Decode(_))
    ));
}
