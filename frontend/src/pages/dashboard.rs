use client::{PredictionError, PredictionResult, Report, Session};
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use wasm_bindgen::JsCast;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

use crate::components::handlers;
use crate::components::preview_area::render_preview_area;
use crate::components::report_modal::ReportModal;
use crate::components::results::render_results;
use crate::components::upload_section::render_upload_section;
use crate::components::utils::render_error_message;
use crate::services::Services;

#[derive(Properties, PartialEq)]
pub struct DashboardProps {
    pub services: Services,
    pub session: Session,
}

pub enum Msg {
    // File operations
    FileChosen(GlooFile),
    ClearFile,

    // Analysis operations
    Analyze,
    PredictionFinished(Result<PredictionResult, PredictionError>),

    // UI states
    SetError(Option<String>),
    SetDragging(bool),
    OpenReport,
    CloseReport,

    // Input events
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

/// Upload, preview and analysis of a single retinal image.
pub struct Dashboard {
    pub(crate) file: Option<GlooFile>,
    pub(crate) preview_url: Option<ObjectUrl>,
    pub(crate) result: Option<PredictionResult>,
    pub(crate) report: Option<Report>,
    pub(crate) loading: bool,
    pub(crate) error: Option<String>,
    pub(crate) is_dragging: bool,
    _paste_listener: Option<EventListener>,
}

impl Component for Dashboard {
    type Message = Msg;
    type Properties = DashboardProps;

    fn create(ctx: &Context<Self>) -> Self {
        let paste_listener = web_sys::window().map(|window| {
            let link = ctx.link().clone();
            EventListener::new(&window, "paste", move |event| {
                if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                    link.send_message(Msg::HandlePaste(clipboard_event.clone()));
                }
            })
        });

        Self {
            file: None,
            preview_url: None,
            result: None,
            report: None,
            loading: false,
            error: None,
            is_dragging: false,
            _paste_listener: paste_listener,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FileChosen(file) => handlers::handle_file_chosen(self, file),
            Msg::ClearFile => handlers::handle_clear_file(self),

            Msg::Analyze => handlers::handle_analyze(self, ctx),
            Msg::PredictionFinished(outcome) => handlers::handle_prediction_finished(self, outcome),

            Msg::SetError(error) => {
                self.error = error;
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }
            Msg::OpenReport => handlers::handle_open_report(self, ctx),
            Msg::CloseReport => {
                self.report = None;
                true
            }

            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
            Msg::HandlePaste(event) => handlers::handle_paste(ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let on_close = ctx.link().callback(|_| Msg::CloseReport);

        html! {
            <section class="dashboard">
                <header class="page-header">
                    <h1><i class="fa-solid fa-eye"></i>{" Retinal Image Analysis"}</h1>
                    <p class="subtitle">{"Upload a fundus photograph to screen for diabetic retinopathy"}</p>
                </header>

                <div class="upload-section">
                    { render_upload_section(self, ctx) }
                    { render_preview_area(self, ctx) }
                </div>
                { render_error_message(self.error.as_deref()) }
                { render_results(self, ctx) }

                if let Some(report) = self.report.clone() {
                    <ReportModal {report} {on_close} />
                }
            </section>
        }
    }
}
