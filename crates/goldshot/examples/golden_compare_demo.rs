//! Golden Screenshot Demo
//!
//! Walks through the golden comparison lifecycle:
//! - Update mode seeding a missing golden
//! - A passing comparison
//! - A mismatch with diff and current artifacts
//! - A tolerance override
//!
//! Run with: cargo run --example golden_compare_demo -p goldshot

use goldshot::{
    init_tracing, Comparator, CompareRequest, ComparisonOverrides, GoldenConfig, ScreenshotData,
    UpdateMode,
};
use image::{ImageEncoder, Rgba, RgbaImage};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    println!("=== Golden Screenshot Demo ===\n");

    let workspace = tempfile::tempdir()?;
    let golden = workspace.path().join("goldens").join("button.png");
    let artifacts = workspace.path().join("artifacts");

    // Demo 1: Update mode seeds the golden
    println!("1. Update Mode");
    println!("   -----------");
    let blue = encode_png(&create_solid_image(64, 32, Rgba([30, 90, 200, 255])))?;
    let updater = Comparator::new(GoldenConfig::new().with_update_mode(UpdateMode::Update));
    let verdict = updater.compare_screenshot(blue.clone(), &golden)?;
    println!("   {verdict}\n");

    // Demo 2: Same capture passes
    println!("2. Identical Capture");
    println!("   -----------------");
    let comparator = Comparator::new(GoldenConfig::new());
    let verdict = comparator.compare_screenshot(blue, &golden)?;
    println!("   {verdict}\n");

    // Demo 3: Changed capture fails with artifacts
    println!("3. Changed Capture");
    println!("   ---------------");
    let mut changed = create_solid_image(64, 32, Rgba([30, 90, 200, 255]));
    for x in 10..20 {
        for y in 5..15 {
            changed.put_pixel(x, y, Rgba([250, 250, 250, 255]));
        }
    }
    let changed = ScreenshotData::from(encode_png(&changed)?);
    let request = CompareRequest::new(&golden).with_output_folder(&artifacts);
    match comparator.compare(changed, &request) {
        Ok(verdict) => println!("   unexpected: {verdict}"),
        Err(err) => {
            println!("   {err}");
            for path in err.artifact_paths() {
                println!("   artifact: {}", path.display());
            }
        }
    }
    println!();

    // Demo 4: Slight shade change within tolerance
    println!("4. Tolerance Override");
    println!("   ------------------");
    let shade = ScreenshotData::from(encode_png(&create_solid_image(
        64,
        32,
        Rgba([32, 91, 201, 255]),
    ))?);
    let strict = CompareRequest::new(&golden)
        .with_overrides(ComparisonOverrides::new().strict(true));
    let lenient = CompareRequest::new(&golden)
        .with_overrides(ComparisonOverrides::new().tolerance(5.0));
    println!(
        "   strict:  {}",
        comparator
            .compare(shade.clone(), &strict)
            .map_or_else(|e| e.to_string(), |v| v.to_string())
    );
    println!(
        "   lenient: {}",
        comparator
            .compare(shade, &lenient)
            .map_or_else(|e| e.to_string(), |v| v.to_string())
    );

    println!("\n=== Demo Complete ===");
    Ok(())
}

fn create_solid_image(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer).write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buffer)
}
