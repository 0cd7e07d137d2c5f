use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use visionchat::config::OllamaConfig;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Write a small PNG and return its path and encoded bytes
#[allow(dead_code)]
pub fn temp_png(width: u32, height: u32) -> (TempDir, PathBuf, Vec<u8>) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let path = temp_dir.path().join("image.png");
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]))
        .save(&path)
        .expect("failed to write png");
    let bytes = fs::read(&path).expect("failed to read png");
    (temp_dir, path, bytes)
}

/// Ollama settings pointing at a mock server
#[allow(dead_code)]
pub fn ollama_config(host: &str) -> OllamaConfig {
    OllamaConfig {
        host: host.to_string(),
        model: "llava".to_string(),
        timeout_seconds: 5,
    }
}

/// NDJSON body of a streaming `/api/chat` response carrying `parts`
#[allow(dead_code)]
pub fn ndjson_body(parts: &[&str]) -> String {
    let mut body = String::new();
    for part in parts {
        let line = serde_json::json!({
            "model": "llava",
            "message": {"role": "assistant", "content": part},
            "done": false,
        });
        body.push_str(&line.to_string());
        body.push('\n');
    }
    body.push_str(r#"{"model":"llava","done":true,"eval_count":3}"#);
    body.push('\n');
    body
}

/// Non-streaming `/api/chat` response body
#[allow(dead_code)]
pub fn chat_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "llava",
        "message": {"role": "assistant", "content": content},
        "done": true,
    })
}

pub const BOUNDARY: &str = "visionchat-integration-boundary";

/// Multipart body with an `image` file part and the given text parts
#[allow(dead_code)]
pub fn multipart_body(image: Option<&[u8]>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(bytes) = image {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"image\"; filename=\"image.png\"\r\nContent-Type: image/png\r\n\r\n",
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
