#[cfg(feature = "serde")]
use vmatch_cli::{PipelineBuilder, PipelineConfig};

#[cfg(feature = "serde")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔧 Pipeline Configuration Serialization Demo");
    println!("============================================\n");

    let dir = std::env::temp_dir().join("vmatch-config-demo");
    std::fs::create_dir_all(&dir)?;

    // Demo 1: Create configurations
    println!("📋 Demo 1: Creating Configurations");

    let orb = PipelineConfig::orb_preset();
    let sift = PipelineConfig::sift_preset();
    let custom = PipelineBuilder::new()
        .ratio_test(false)
        .fixed_distance_threshold(Some(48.0))
        .reprojection_threshold(4.0)
        .seed(7)
        .to_config()
        .with_metadata("Custom", "Fixed Hamming cap, reproducible RANSAC");

    for cfg in [&orb, &sift, &custom] {
        println!("   • {}", cfg.summary());
    }

    // Demo 2: JSON
    println!("\n📄 Demo 2: JSON Serialization");
    let json = custom.to_json()?;
    println!("{}", json);
    custom.save_json(dir.join("custom.json"))?;

    // Demo 3: TOML
    println!("\n📋 Demo 3: TOML Serialization");
    let toml = sift.to_toml()?;
    println!("{}", toml);
    sift.save_toml(dir.join("sift.toml"))?;

    // Demo 4: Load and validate
    println!("\n🔍 Demo 4: Loading and Validation");
    let loaded_json = PipelineConfig::load(dir.join("custom.json"))?;
    let loaded_toml = PipelineConfig::load(dir.join("sift.toml"))?;
    assert_eq!(loaded_json, custom);
    assert_eq!(loaded_toml, sift);
    println!("   ✅ Round trip preserved both configurations");

    // Demo 5: Invalid configurations are rejected on load
    println!("\n🚫 Demo 5: Validation Errors");
    match PipelineConfig::from_json(r#"{"ransac": {"confidence": 1.5}}"#) {
        Ok(_) => println!("   unexpected success"),
        Err(e) => println!("   rejected: {}", e),
    }

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[cfg(not(feature = "serde"))]
fn main() {
    println!("This demo requires the 'serde' feature");
}
