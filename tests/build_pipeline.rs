//! End-to-end build tests over a scaffolded project.

use siteforge::build::{BuildContext, BuildPipeline};
use siteforge::config::default_config;
use siteforge::stages::clean;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn png(root: &Path, rel: &str, shade: u8) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbaImage::from_pixel(4, 4, image::Rgba([shade, shade, shade, 255]))
        .save(path)
        .unwrap();
}

fn seed_project(root: &Path) {
    write(
        root,
        "src/index.html",
        concat!(
            "<html><head>\n",
            "<!-- build:css /css/site.css -->\n",
            "<link rel=\"stylesheet\" href=\"/css/site.css\">\n",
            "<!-- endbuild -->\n",
            "</head><body><img src=\"/img/logo.png\"></body></html>"
        )
        .as_bytes(),
    );
    write(
        root,
        "src/css/site.css",
        b"/* inject:imports */\n/* endinject */\nbody { color: red; }\n",
    );
    write(root, "src/css/layout.css", b".wrap { margin: 0 auto; }\n");
    png(root, "src/favicon.png", 40);
    png(root, "src/img/logo.png", 80);
    png(root, "src/img/sprite/star.png", 120);
    write(root, "src/robots.txt", b"User-agent: *\n");
}

fn build(root: &Path) -> BuildPipeline {
    BuildPipeline::new(BuildContext::new(default_config(), root.to_path_buf()))
}

fn manifest(root: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(root.join("dist/rev-manifest.json")).unwrap())
        .unwrap()
}

#[test]
fn full_build_ships_a_consistent_site() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());

    build(temp.path()).build().unwrap();
    let dist = temp.path().join("dist");
    let html = fs::read_to_string(dist.join("index.html")).unwrap();
    let manifest = manifest(temp.path());

    // Annotation block collapsed to one revved link tag
    assert!(!html.contains("build:css"));
    assert_eq!(html.matches("<link rel=\"stylesheet\"").count(), 1);

    // Every manifest rename resolves to a shipped file, and no shipped
    // reference still uses an original name
    for (original, renamed) in manifest.as_object().unwrap() {
        let renamed = renamed.as_str().unwrap();
        assert!(dist.join(renamed).is_file(), "missing {}", renamed);
        assert!(!html.contains(&format!("\"/{}\"", original)));
    }

    // The partial and the sprite rules both reached the shipped bundle
    let css_rel = manifest["css/site.css"].as_str().unwrap();
    let css = fs::read_to_string(dist.join(css_rel)).unwrap();
    assert!(css.contains(".wrap"));
    assert!(css.contains(".sprite-star"));
    // Sprite url itself is revved
    let sprite_rel = manifest["img/sprite.png"].as_str().unwrap();
    assert!(css.contains(sprite_rel));

    // Favicon bundle and loose files
    assert!(dist.join("favicon/apple-touch-icon.png").is_file());
    assert!(dist.join("robots.txt").is_file());
}

#[test]
fn changed_image_gets_a_new_name() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());

    build(temp.path()).build().unwrap();
    let before = manifest(temp.path())["img/logo.png"].as_str().unwrap().to_string();

    png(temp.path(), "src/img/logo.png", 81);
    build(temp.path()).build().unwrap();
    let after = manifest(temp.path())["img/logo.png"].as_str().unwrap().to_string();

    assert_ne!(before, after);
    let html = fs::read_to_string(temp.path().join("dist/index.html")).unwrap();
    assert!(html.contains(&after));
    assert!(!html.contains(&before));
}

#[test]
fn unchanged_content_keeps_its_name() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());

    build(temp.path()).build().unwrap();
    let before = manifest(temp.path())["img/logo.png"].as_str().unwrap().to_string();

    // Touch unrelated files only
    write(temp.path(), "src/css/layout.css", b".wrap { margin: 0; }\n");
    build(temp.path()).build().unwrap();
    let after = manifest(temp.path())["img/logo.png"].as_str().unwrap().to_string();

    assert_eq!(before, after);
}

#[test]
fn clean_is_idempotent() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());

    build(temp.path()).build().unwrap();
    assert!(temp.path().join("dist").exists());

    clean::clean_all(&ctx).unwrap();
    assert!(!temp.path().join("dist").exists());
    assert!(!temp.path().join(".tmp").exists());
    clean::clean_all(&ctx).unwrap();
}

#[test]
fn broken_stylesheet_fails_and_preserves_previous_css() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());

    build(temp.path()).build().unwrap();
    let css_rel = manifest(temp.path())["css/site.css"].as_str().unwrap().to_string();
    let previous = fs::read(temp.path().join("dist").join(&css_rel)).unwrap();

    write(
        temp.path(),
        "src/css/site.css",
        b"/* inject:imports */\n/* endinject */\n@import \"does-not-exist.css\";\n",
    );
    assert!(build(temp.path()).build().is_err());

    let kept = fs::read(temp.path().join("dist").join(&css_rel)).unwrap();
    assert_eq!(previous, kept);
}

#[test]
fn non_png_images_pass_through_byte_identical() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());

    let mut jpeg = Vec::new();
    image::RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]))
        .write_to(&mut Cursor::new(&mut jpeg), image::ImageOutputFormat::Jpeg(90))
        .unwrap();
    write(temp.path(), "src/img/photo.jpg", &jpeg);

    build(temp.path()).build().unwrap();
    let renamed = manifest(temp.path())["img/photo.jpg"].as_str().unwrap().to_string();
    let shipped = fs::read(temp.path().join("dist").join(renamed)).unwrap();
    assert_eq!(shipped, jpeg);
}
