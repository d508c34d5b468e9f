//! `identify` subcommand: read an image, submit it, print the fact card

use mime::Mime;
use std::path::Path;

use assetlens::client::{IdentifyClient, RequestState, run_identification};
use assetlens::config::Config;
use assetlens::normalize::normalize;
use assetlens::render::{render_error, render_fact_card, render_selection};
use assetlens::upload::{ImageBlob, UploadState};

use crate::cli::IdentifyArgs;

pub async fn run(args: IdentifyArgs) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = match args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if let Some(endpoint) = args.endpoint {
        config.service.endpoint = endpoint;
    }

    let bytes = tokio::fs::read(&args.image).await?;
    let blob = ImageBlob::new(bytes, mime_for_path(&args.image), file_name_for(&args.image));
    println!("{}", render_selection(&blob));

    let mut state = UploadState::new();
    state.select_file(blob);

    let client = IdentifyClient::new(config.client_config())?;
    run_identification(&mut state, &client).await;

    match state.request() {
        RequestState::Success(raw) => {
            println!("\n{}", render_fact_card(&normalize(raw)));
        }
        RequestState::Failed(error) => {
            eprintln!("\n{}", render_error(error));
            std::process::exit(1);
        }
        // A selection was made above, so the request always reaches a
        // terminal state.
        RequestState::Idle | RequestState::Pending => {}
    }

    Ok(())
}

/// MIME type from the file extension; the service is the final authority on
/// whether it accepts the content.
fn mime_for_path(path: &Path) -> Mime {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("png") => mime::IMAGE_PNG,
        Some("gif") => mime::IMAGE_GIF,
        Some("webp") => "image/webp"
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

fn file_name_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}
