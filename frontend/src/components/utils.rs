use chrono::{DateTime, Utc};
use client::Session;
use gloo_file::File as GlooFile;
use gloo_timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsValue;
use web_sys::FileList;
use yew::prelude::*;

// Debounce function to limit button events
pub fn debounce<F>(duration: u32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));

    Callback::from(move |_| {
        let mut timeout_ref = timeout.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        *timeout_ref = Some(Timeout::new(duration, move || inner_callback()));
    })
}

/// First image in the list; the dashboard analyzes one image at a time.
pub fn first_image(file_list: &FileList) -> Option<GlooFile> {
    (0..file_list.length())
        .filter_map(|i| file_list.item(i))
        .find(|file| file.type_().starts_with("image/"))
        .map(GlooFile::from)
}

pub fn render_error_message(error: Option<&str>) -> Html {
    match error {
        Some(message) => html! {
            <div class="error-message">
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ message }</p>
            </div>
        },
        None => html! {},
    }
}

/// Date and time in the browser's locale.
pub fn format_local_date(at: DateTime<Utc>) -> String {
    let date = js_sys::Date::new(&JsValue::from_f64(at.timestamp_millis() as f64));
    String::from(date.to_locale_string("default", &JsValue::UNDEFINED))
}

pub fn display_name(session: &Session) -> String {
    session
        .profile()
        .map(|profile| profile.name.clone())
        .or_else(|| session.email().map(str::to_string))
        .unwrap_or_else(|| "Patient".to_string())
}

pub fn avatar_initial(session: &Session) -> String {
    display_name(session)
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

/// CSS modifier for a diagnosis label.
pub fn severity_class(diagnosis: &str) -> &'static str {
    use shared::DiagnosisClass;
    use std::str::FromStr;

    match DiagnosisClass::from_str(diagnosis) {
        Ok(DiagnosisClass::NoDr) => "severity-none",
        Ok(DiagnosisClass::Mild) => "severity-mild",
        Ok(DiagnosisClass::Moderate) => "severity-moderate",
        Ok(DiagnosisClass::Severe) | Ok(DiagnosisClass::Proliferative) => "severity-severe",
        Err(_) => "severity-unknown",
    }
}
