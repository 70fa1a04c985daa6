use super::*;
use Color as C;

fn mkimage<const W: usize, const H: usize>(data: [[Color; W]; H]) -> Image {
    let bytes = data.iter().flatten().flat_map(|c| c.to_array()).collect();
    Image::from_raw((W as u32, H as u32), PixelFormat::Rgba8, W * 4, bytes).unwrap()
}

#[test]
fn crop() {
    let image = mkimage([[C::RED, C::GREEN], [C::BLUE, C::WHITE]]).with_scale(2.0);

    let crop = image.crop(Rect::from_top_left(1, 0, 1, 2)).unwrap();
    assert_eq!(crop.resolution(), Resolution::new(1, 2));
    assert_eq!(crop.pixel(0, 0), C::GREEN);
    assert_eq!(crop.pixel(0, 1), C::WHITE);
    assert_eq!(crop.scale(), 2.0);

    assert!(image.crop(Rect::from_top_left(1, 1, 2, 1)).is_err());
    assert!(image.crop(Rect::from_top_left(0, 0, 0, 1)).is_err());
}

#[test]
fn padded_rows() {
    let data = vec![1, 2, 3, 99, 4, 5, 6, 99];
    let image = Image::from_raw((1, 2), PixelFormat::Rgb8, 4, data).unwrap();
    assert_eq!(image.row(1), &[4, 5, 6]);
    assert_eq!(image.pixel(0, 1), C::from_rgb8(4, 5, 6));
    assert_eq!(image.to_compact_vec().unwrap(), [1, 2, 3, 4, 5, 6]);
}

#[test]
fn from_raw_validation() {
    assert!(Image::from_raw((0, 1), PixelFormat::Rgb8, 3, vec![]).is_err());
    assert!(Image::from_raw((2, 1), PixelFormat::Rgb8, 5, vec![0; 6]).is_err());
    assert!(Image::from_raw((2, 2), PixelFormat::Rgb8, 6, vec![0; 11]).is_err());
    assert!(matches!(
        Image::from_raw((2, 2), PixelFormat::Nv12, 2, vec![0; 6]),
        Err(Error::UnsupportedFormat { .. })
    ));
}

#[test]
fn convert() {
    let image = mkimage([[C::RED.with_alpha(7), C::WHITE]]);

    let bgra = image.convert(PixelFormat::Bgra8).unwrap();
    assert_eq!(bgra.raw_bytes()[..4], [0, 0, 255, 7]);
    assert_eq!(bgra.pixel(0, 0), C::RED.with_alpha(7));

    let rgb = image.convert(PixelFormat::Rgb8).unwrap();
    assert_eq!(rgb.pixel(0, 0), C::RED); // alpha dropped

    let gray = image.convert(PixelFormat::Gray8).unwrap();
    assert_eq!(gray.raw_bytes(), &[76, 255]);
}

#[test]
fn size_in_points() {
    let image = Image::filled((30, 20), PixelFormat::Gray8, C::BLACK)
        .unwrap()
        .with_scale(2.0);
    assert_eq!(image.size_in_points(), (15.0, 10.0));
}

#[test]
fn image_crate_interop() {
    let image = mkimage([[C::RED, C::BLUE]]);
    let buf = image.to_image_buffer().unwrap();
    assert_eq!(buf.get_pixel(1, 0).0, [0, 0, 255, 255]);

    let back = Image::from_dynamic(&::image::DynamicImage::ImageRgba8(buf)).unwrap();
    assert_eq!(back, image);
}

#[test]
fn debug() {
    let image = Image::filled((3, 2), PixelFormat::Rgb8, C::BLACK).unwrap();
    assert_eq!(format!("{image:?}"), "3x2 Rgb8 Image (scale 1, Up)");
}
