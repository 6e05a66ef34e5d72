use std::fs;
use std::io::Cursor;
use std::time::{Duration, Instant};

use httpmock::prelude::*;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use tempfile::TempDir;

use mascot_cutout::{
    BackgroundRemover, BatchRunner, CutoutError, Outcome, RemoveBgClient, MASCOT_IMAGES,
};

const PATH: &str = "/v1.0/removebg";

fn cutout_png() -> Vec<u8> {
    cutout_png_sized(4)
}

/// Left half opaque, right half transparent.
fn cutout_png_sized(size: u32) -> Vec<u8> {
    let cutout = RgbaImage::from_fn(size, size, |x, _| {
        if x < size / 2 {
            Rgba([10, 20, 30, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(cutout)
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode test png");
    buffer.into_inner()
}

#[test]
fn test_remote_cutout_is_returned() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(PATH)
            .header("X-Api-Key", "test-key")
            .body_contains("image_file")
            .body_contains("auto");
        then.status(200)
            .header("content-type", "image/png")
            .body(cutout_png());
    });

    let client = RemoveBgClient::new(server.url(PATH), "test-key")?;
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([1, 1, 1])));
    let result = client.remove_background(&img)?.to_rgba8();

    mock.assert();
    assert_eq!(result.get_pixel(0, 0)[3], 255);
    assert_eq!(result.get_pixel(3, 3)[3], 0);

    let mask = client.predict_mask(&img)?;
    assert_eq!(mask.get_pixel(1, 0)[0], 255);
    assert_eq!(mask.get_pixel(2, 0)[0], 0);
    Ok(())
}

#[test]
fn test_remote_error_status_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(402).body("insufficient credits");
    });

    let client = RemoveBgClient::new(server.url(PATH), "test-key")?;
    let img = DynamicImage::new_rgb8(2, 2);

    match client.remove_background(&img) {
        Err(CutoutError::Remote { status, body }) => {
            assert_eq!(status, 402);
            assert_eq!(body, "insufficient credits");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_remote_failures_counted_per_image() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(500).body("server exploded");
    });

    let temp_dir = TempDir::new()?;
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&input_dir)?;
    for name in &MASCOT_IMAGES[..2] {
        RgbImage::new(3, 3).save(input_dir.join(name))?;
    }

    let client = RemoveBgClient::new(server.url(PATH), "test-key")?;
    let summary = BatchRunner::new(client, &input_dir, &output_dir).run()?;

    mock.assert_hits(2);
    assert_eq!(
        (summary.processed, summary.failed, summary.skipped),
        (0, 2, 7)
    );
    match summary.outcome(MASCOT_IMAGES[0]) {
        Some(Outcome::Failed(message)) => assert!(message.contains("status 500")),
        other => panic!("unexpected outcome {other:?}"),
    }
    Ok(())
}

#[test]
fn test_downscaled_cutout_is_resized_to_input() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(200)
            .header("content-type", "image/png")
            .body(cutout_png_sized(2));
    });

    let client = RemoveBgClient::new(server.url(PATH), "test-key")?;
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([1, 1, 1])));

    let mask = client.predict_mask(&img)?;
    assert_eq!(mask.dimensions(), (4, 4));
    assert!(mask.get_pixel(0, 0)[0] > 128);
    assert!(mask.get_pixel(3, 0)[0] < 128);

    let result = client.remove_background(&img)?;
    assert_eq!((result.width(), result.height()), (4, 4));
    Ok(())
}

#[test]
fn test_request_delay_only_after_success() -> Result<(), Box<dyn std::error::Error>> {
    const OK_PATH: &str = "/ok/removebg";
    const FAIL_PATH: &str = "/fail/removebg";
    let delay = Duration::from_millis(300);

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(OK_PATH);
        then.status(200)
            .header("content-type", "image/png")
            .body(cutout_png());
    });
    server.mock(|when, then| {
        when.method(POST).path(FAIL_PATH);
        then.status(500).body("server exploded");
    });
    let img = DynamicImage::new_rgb8(4, 4);

    let client = RemoveBgClient::new(server.url(OK_PATH), "test-key")?.with_request_delay(delay);
    let started = Instant::now();
    client.remove_background(&img)?;
    assert!(started.elapsed() >= delay);

    let client = RemoveBgClient::new(server.url(FAIL_PATH), "test-key")?.with_request_delay(delay);
    let started = Instant::now();
    assert!(client.remove_background(&img).is_err());
    assert!(started.elapsed() < delay);
    Ok(())
}
