use base64::{prelude::BASE64_STANDARD, Engine};
use image::{Rgb, RgbImage};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use logmass::adapters::{
    http::{router, state::HttpState},
    precomputed::PrecomputedDetector,
    render::ImageprocAnnotator,
};
use logmass::application::services::EstimationService;
use logmass::domain::{calibration::Calibration, detection::Detection};

async fn spawn_server(detections: Vec<Detection>) -> SocketAddr {
    let service = EstimationService::new(
        Arc::new(PrecomputedDetector::new(detections)),
        Arc::new(ImageprocAnnotator::without_font()),
        Calibration::default(),
    );
    let app = router(HttpState { estimation: Arc::new(service) }, 4 * 1024 * 1024);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn sample_png(w: u32, h: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(w, h, Rgb([120, 80, 40]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png).unwrap();
    buf
}

fn image_part(bytes: Vec<u8>) -> Part {
    Part::bytes(bytes).file_name("logs.png").mime_str("image/png").unwrap()
}

async fn post_estimate(addr: SocketAddr, form: Form) -> (u16, Value) {
    let res = reqwest::Client::new()
        .post(format!("http://{addr}/api/estimate"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn estimate_returns_measurements_and_annotated_png() {
    let addr = spawn_server(vec![
        Detection::new(100, 100, 200, 150, 0.91),
        Detection::new(300, 100, 300, 150, 0.80),
        Detection::new(250, 200, 350, 260, 0.75),
    ])
    .await;

    let (status, body) = post_estimate(addr, Form::new().part("image", image_part(sample_png(480, 320)))).await;
    assert_eq!(status, 200, "{body}");

    assert_eq!(body["width"], 480);
    assert_eq!(body["height"], 320);
    let ms = body["measurements"].as_array().unwrap();
    assert_eq!(ms.len(), 2);
    assert!((ms[0]["mass_kg"].as_f64().unwrap() - 37.699).abs() < 1e-3);
    assert!((ms[0]["diameter_m"].as_f64().unwrap() - 0.2).abs() < 1e-9);
    assert_eq!(ms[0]["bbox"]["x1"], 100);

    let summary = &body["summary"];
    assert_eq!(summary["count"], 2);
    assert_eq!(summary["skipped"], 1);
    assert!((summary["total_mass_kg"].as_f64().unwrap() - 2.0 * 37.699).abs() < 1e-2);
    assert!((summary["mean_diameter_m"].as_f64().unwrap() - 0.2).abs() < 1e-9);

    let png = BASE64_STANDARD.decode(body["annotated_png_base64"].as_str().unwrap()).unwrap();
    let annotated = image::load_from_memory(&png).unwrap().to_rgb8();
    assert_eq!(annotated.dimensions(), (480, 320));
    assert_eq!(annotated.get_pixel(100, 120), &Rgb([0, 255, 0]));
}

#[tokio::test]
async fn density_field_overrides_for_one_request() {
    let addr = spawn_server(vec![Detection::new(100, 100, 200, 150, 0.9)]).await;

    let form = Form::new().part("image", image_part(sample_png(320, 240))).text("density", "oak");
    let (status, body) = post_estimate(addr, form).await;
    assert_eq!(status, 200, "{body}");
    assert!((body["measurements"][0]["mass_kg"].as_f64().unwrap() - 43.982).abs() < 1e-3);
    assert_eq!(body["calibration"]["wood_density_kg_per_m3"], 700.0);

    let cfg: Value = reqwest::get(format!("http://{addr}/api/config")).await.unwrap().json().await.unwrap();
    assert_eq!(cfg["calibration"]["wood_density_kg_per_m3"], 600.0);
}

#[tokio::test]
async fn empty_scene_returns_the_input_pixels() {
    let addr = spawn_server(vec![]).await;
    let input = sample_png(64, 32);
    let (status, body) = post_estimate(addr, Form::new().part("image", image_part(input.clone()))).await;
    assert_eq!(status, 200);
    assert_eq!(body["summary"]["count"], 0);
    assert!(body["summary"]["mean_diameter_m"].is_null());

    let png = BASE64_STANDARD.decode(body["annotated_png_base64"].as_str().unwrap()).unwrap();
    let out = image::load_from_memory(&png).unwrap().to_rgb8();
    let original = image::load_from_memory(&input).unwrap().to_rgb8();
    assert_eq!(out, original);
}

#[tokio::test]
async fn bad_uploads_are_rejected() {
    let addr = spawn_server(vec![]).await;

    let (status, body) = post_estimate(addr, Form::new().text("density", "pine")).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("image"));

    let garbage = Part::bytes(b"definitely not a jpeg".to_vec()).file_name("x.jpg");
    let (status, _) = post_estimate(addr, Form::new().part("image", garbage)).await;
    assert_eq!(status, 422);

    let form = Form::new().part("image", image_part(sample_png(8, 8))).text("density", "5000");
    let (status, _) = post_estimate(addr, form).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn calibration_can_be_read_and_updated() {
    let addr = spawn_server(vec![Detection::new(100, 100, 200, 150, 0.9)]).await;
    let client = reqwest::Client::new();

    let cfg: Value = client.get(format!("http://{addr}/api/config")).send().await.unwrap().json().await.unwrap();
    assert_eq!(cfg["calibration"]["pixels_to_meters_factor"], 0.002);
    assert_eq!(cfg["calibration"]["log_length_m"], 2.0);

    let res = client
        .post(format!("http://{addr}/api/config"))
        .json(&serde_json::json!({ "wood_density": "pine" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["ok"], true);
    assert_eq!(updated["calibration"]["wood_density"], "pine");
    assert_eq!(updated["calibration"]["wood_density_kg_per_m3"], 500.0);

    let res = client
        .post(format!("http://{addr}/api/config"))
        .json(&serde_json::json!({ "pixels_to_meters_factor": -1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);

    let cfg: Value = client.get(format!("http://{addr}/api/config")).send().await.unwrap().json().await.unwrap();
    assert_eq!(cfg["calibration"]["wood_density"], "pine");
    assert_eq!(cfg["calibration"]["wood_density_kg_per_m3"], 500.0);
    assert_eq!(cfg["calibration"]["pixels_to_meters_factor"], 0.002);

    let (_, body) = post_estimate(addr, Form::new().part("image", image_part(sample_png(320, 240)))).await;
    let mass = body["measurements"][0]["mass_kg"].as_f64().unwrap();
    assert!((mass - 31.416).abs() < 1e-3);
}

#[tokio::test]
async fn densities_lists_presets() {
    let addr = spawn_server(vec![]).await;
    let body: Value = reqwest::get(format!("http://{addr}/api/densities")).await.unwrap().json().await.unwrap();
    let presets = body["presets"].as_array().unwrap();
    assert_eq!(presets.len(), 2);
    assert_eq!(presets[1]["name"], "oak");
    assert_eq!(presets[1]["kg_per_m3"], 700.0);
    assert_eq!(body["custom_min"], 100.0);
    assert_eq!(body["custom_max"], 1000.0);
}
