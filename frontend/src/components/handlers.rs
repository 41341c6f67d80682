use chrono::Utc;
use client::{PredictionError, PredictionResult, Report, encode_image};
use gloo_file::{File as GlooFile, ObjectUrl};
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

use super::utils::first_image;
use crate::pages::dashboard::{Dashboard, Msg};
use crate::services::Services;

pub fn handle_file_chosen(model: &mut Dashboard, file: GlooFile) -> bool {
    log::info!("Selected {} ({} bytes)", file.name(), file.size());
    model.preview_url = Some(ObjectUrl::from(file.clone()));
    model.file = Some(file);
    model.result = None;
    model.report = None;
    model.error = None;
    true
}

pub fn handle_clear_file(model: &mut Dashboard) -> bool {
    model.file = None;
    model.preview_url = None;
    model.result = None;
    model.report = None;
    model.error = None;
    true
}

pub fn handle_analyze(model: &mut Dashboard, ctx: &Context<Dashboard>) -> bool {
    if model.loading {
        return false;
    }
    let Some(file) = model.file.clone() else {
        ctx.link()
            .send_message(Msg::SetError(Some("Please select an image first.".into())));
        return false;
    };

    model.loading = true;
    model.error = None;
    model.result = None;
    model.report = None;

    let services = ctx.props().services.clone();
    let link = ctx.link().clone();
    spawn_local(async move {
        let outcome = analyze(&services, &file).await;
        // History is updated here so the record survives leaving the page.
        if let Ok(result) = &outcome {
            services.history.prepend(result.clone());
        }
        link.send_message(Msg::PredictionFinished(outcome));
    });

    true
}

async fn analyze(services: &Services, file: &GlooFile) -> Result<PredictionResult, PredictionError> {
    let bytes = gloo_file::futures::read_as_bytes(file)
        .await
        .map_err(|e| PredictionError::InvalidImage(e.to_string()))?;
    let payload = encode_image(&bytes, &file.raw_mime_type())?;
    let credential = services.session.credential().await?;
    services.prediction.predict(&payload, &credential).await
}

pub fn handle_prediction_finished(
    model: &mut Dashboard,
    outcome: Result<PredictionResult, PredictionError>,
) -> bool {
    model.loading = false;
    match outcome {
        Ok(result) => {
            model.result = Some(result);
        }
        Err(e) => {
            log::error!("Analysis failed: {}", e);
            model.error = Some(e.user_message());
        }
    }
    true
}

pub fn handle_open_report(model: &mut Dashboard, ctx: &Context<Dashboard>) -> bool {
    let Some(result) = &model.result else {
        return false;
    };
    model.report = Report::new(&ctx.props().session, result, Utc::now());
    if model.report.is_none() {
        model.error = Some("Please log in again to view the report.".into());
    }
    true
}

pub fn handle_drop(model: &mut Dashboard, ctx: &Context<Dashboard>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    let file = event
        .data_transfer()
        .and_then(|data_transfer| data_transfer.files())
        .and_then(|file_list| first_image(&file_list));
    match file {
        Some(file) => ctx.link().send_message(Msg::FileChosen(file)),
        None => ctx
            .link()
            .send_message(Msg::SetError(Some("Please drop a PNG or JPEG image.".into()))),
    }

    true
}

pub fn handle_paste(ctx: &Context<Dashboard>, event: ClipboardEvent) -> bool {
    let file = event
        .clipboard_data()
        .and_then(|data_transfer| data_transfer.files())
        .and_then(|file_list| first_image(&file_list));
    if let Some(file) = file {
        event.prevent_default();
        ctx.link().send_message(Msg::FileChosen(file));
    }
    false
}
