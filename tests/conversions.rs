use anyhow::Result;
use approx::assert_abs_diff_eq;
use pixbridge::{
    buffer::{Attachments, PixelBuffer},
    chunk,
    image::{Color, Image, Orientation, PixelFormat, Resolution},
    nn::{self, DecodeOptions, ElementType, EncodeOptions, Tensor},
    transform, Error,
};

fn random_image(rng: &mut fastrand::Rng, w: u32, h: u32) -> Result<Image> {
    let mut bytes = vec![0; (w * h * 4) as usize];
    rng.fill(&mut bytes);
    for alpha in bytes.iter_mut().skip(3).step_by(4) {
        *alpha = 255;
    }
    Ok(Image::from_rgba8_bytes(&bytes, (w, h), 1.0, Orientation::Up)?)
}

#[test]
fn encode_decode_round_trip() -> Result<()> {
    pixbridge::init_logger!();
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    let image = random_image(&mut rng, 17, 9)?;

    for ty in [ElementType::F32, ElementType::F16, ElementType::F64] {
        let tensor = nn::encode(&image, &EncodeOptions::new().with_element_type(ty))?;
        assert_eq!(tensor.shape(), &[1, 3, 9, 17]);

        let decoded = nn::decode(&tensor, 9, 17, &DecodeOptions::new())?;
        assert_eq!(decoded.format(), PixelFormat::Rgb8);
        for y in 0..9 {
            for x in 0..17 {
                let (a, b) = (image.pixel(x, y), decoded.pixel(x, y));
                for c in 0..3 {
                    let diff = (f32::from(a[c]) - f32::from(b[c])).abs() / 255.0;
                    assert!(diff <= 1.0 / 255.0, "{ty:?} ({x}, {y}): {a:?} vs {b:?}");
                }
            }
        }
    }
    Ok(())
}

#[test]
fn bgra_pixel_encodes_red_first() -> Result<()> {
    let image = Image::filled((2, 2), PixelFormat::Bgra8, Color::RED)?;
    assert_eq!(&image.raw_bytes()[..4], &[0, 0, 255, 255]);

    let tensor = nn::encode(&image, &EncodeOptions::new())?;
    assert_abs_diff_eq!(tensor.get(&[0, 0, 0, 0]), 1.0);
    assert_abs_diff_eq!(tensor.get(&[0, 1, 0, 0]), 0.0);
    assert_abs_diff_eq!(tensor.get(&[0, 2, 0, 0]), 0.0);
    Ok(())
}

#[test]
fn decode_normalizes_jointly() -> Result<()> {
    // R plane spans [0.2, 0.3], G [0.4, 0.7], B is constant. Min and max are taken across all
    // planes, so only the global extremes map to 0 and 255.
    let values = vec![0.2, 0.3, 0.4, 0.7, 0.6, 0.6];
    let tensor = Tensor::from_vec(&[1, 3, 1, 2], values)?;
    let image = nn::decode(&tensor, 1, 2, &DecodeOptions::new().with_normalize(true))?;
    assert_eq!(image.pixel(0, 0), Color::from_rgb8(0, 102, 204));
    assert_eq!(image.pixel(1, 0), Color::from_rgb8(51, 255, 204));

    let constant = Tensor::from_vec(&[3, 1, 1], vec![0.7; 3])?;
    let image = nn::decode(&constant, 1, 1, &DecodeOptions::new().with_normalize(true))?;
    assert_eq!(image.pixel(0, 0), Color::BLACK);
    Ok(())
}

#[test]
fn orientation_normalization_is_idempotent() -> Result<()> {
    let mut rng = fastrand::Rng::with_seed(8);
    let image = random_image(&mut rng, 5, 3)?;
    for orientation in Orientation::ALL {
        let once = transform::normalize_orientation(&image.clone().with_orientation(orientation))?;
        let twice = transform::normalize_orientation(&once)?;
        assert_eq!(once.orientation(), Orientation::Up);
        assert_eq!(once, twice, "{orientation:?}");
        if orientation.swaps_dimensions() {
            assert_eq!(once.resolution(), Resolution::new(3, 5));
        } else {
            assert_eq!(once.resolution(), Resolution::new(5, 3));
        }
    }
    Ok(())
}

#[test]
fn resize_preserves_aspect_ratio() -> Result<()> {
    let mut rng = fastrand::Rng::with_seed(42);
    for _ in 0..200 {
        let (w, h) = (rng.u32(1..1000), rng.u32(1..1000));
        let max_dims = rng.u32(1..500) as f32;
        let image = Image::filled((w, h), PixelFormat::Gray8, Color::BLACK)?;

        let (pw, ph) = transform::possible_dims(&image, max_dims);
        assert!(pw <= max_dims.max(w as f32) && ph <= max_dims.max(h as f32));
        assert!(pw.max(ph) <= max_dims || (pw, ph) == (w as f32, h as f32));
        let ratio = w as f32 / h as f32;
        assert!(
            ((pw / ph) - ratio).abs() <= ratio * 1e-4,
            "{w}x{h} fit into {max_dims}: {pw}x{ph}"
        );
    }
    Ok(())
}

#[test]
fn tiling_round_trip() -> Result<()> {
    let mut rng = fastrand::Rng::with_seed(3);
    for _ in 0..20 {
        let (w, h) = (rng.u32(1..40), rng.u32(1..40));
        let chunk_size = rng.u32(1..16);
        let image = random_image(&mut rng, w, h)?;
        let grid = chunk::split(&image, chunk_size)?;
        assert_eq!(grid.num_columns(), ((w + chunk_size - 1) / chunk_size) as usize);
        assert_eq!(grid.num_rows(), ((h + chunk_size - 1) / chunk_size) as usize);
        let joined = chunk::join(&grid)?;
        let (cw, ch) = (chunk_size.min(w), chunk_size.min(h));
        assert_eq!(
            joined.resolution(),
            Resolution::new(grid.num_columns() as u32 * cw, grid.num_rows() as u32 * ch)
        );
        assert_eq!(joined.crop(image.rect())?, image);
    }
    Ok(())
}

#[test]
fn grayscale_tiles() -> Result<()> {
    let bytes: Vec<u8> = (0..100).collect();
    let image = Image::from_gray8_bytes(&bytes, (10, 10), 1.0, Orientation::Up)?;
    let grid = chunk::split(&image, 4)?;
    let sizes: Vec<Vec<(u32, u32)>> = grid
        .rows()
        .iter()
        .map(|row| row.iter().map(|t| (t.width(), t.height())).collect())
        .collect();
    assert_eq!(
        sizes,
        [
            [(4, 4), (4, 4), (2, 4)],
            [(4, 4), (4, 4), (2, 4)],
            [(4, 2), (4, 2), (2, 2)],
        ]
    );
    let joined = chunk::join(&grid)?;
    assert_eq!(joined.resolution(), Resolution::new(12, 12));
    assert_eq!(joined.crop(image.rect())?.to_gray8_bytes()?, bytes);
    assert_eq!(joined.pixel(10, 10), Color::BLACK);
    Ok(())
}

#[test]
fn byte_length_mismatch() {
    let res = Image::from_rgba8_bytes(&[0; 4 * 4 * 4 - 1], (4, 4), 1.0, Orientation::Up);
    assert!(matches!(res, Err(Error::Mismatch { .. })));
}

#[test]
fn deep_copy_through_buffers() -> Result<()> {
    let mut rng = fastrand::Rng::with_seed(11);
    let image = random_image(&mut rng, 33, 7)?.with_scale(2.0);

    let mut attachments = Attachments::new();
    attachments.set("colorspace", "sRGB").set_local("frame", 3.0);
    let buffer = PixelBuffer::with_attachments(image.resolution(), PixelFormat::Bgra8, attachments)?;
    {
        let mut guard = buffer.lock_mut()?;
        let converted = image.convert(PixelFormat::Bgra8)?;
        for (y, row) in (0..image.height()).zip(converted.rows()) {
            guard.row_mut(0, y).copy_from_slice(row);
        }
    }

    let mut extra = Attachments::new();
    extra.set("colorspace", "Display P3");
    let copy = buffer.deep_copy(&extra)?;
    assert_eq!(copy.attachments().len(), 1);
    assert_eq!(
        copy.to_image(2.0, Orientation::Up)?.convert(PixelFormat::Rgba8)?,
        image
    );
    Ok(())
}
