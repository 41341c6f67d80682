use client::Route;
use wasm_bindgen::JsValue;

pub fn current_route() -> Route {
    web_sys::window()
        .and_then(|window| window.location().pathname().ok())
        .map(|path| Route::from_path(&path))
        .unwrap_or(Route::Root)
}

pub fn push(route: Route) {
    let Some(history) = web_sys::window().and_then(|w| w.history().ok()) else {
        return;
    };
    if let Err(e) = history.push_state_with_url(&JsValue::NULL, "", Some(route.path())) {
        log::warn!("pushState failed: {:?}", e);
    }
    set_title(route);
}

/// Used for redirects so the back button skips the rejected route.
pub fn replace(route: Route) {
    let Some(history) = web_sys::window().and_then(|w| w.history().ok()) else {
        return;
    };
    if let Err(e) = history.replace_state_with_url(&JsValue::NULL, "", Some(route.path())) {
        log::warn!("replaceState failed: {:?}", e);
    }
    set_title(route);
}

fn set_title(route: Route) {
    if let Some(document) = web_sys::window().and_then(|w| w.document()) {
        document.set_title(&format!("{} | DR Screening", route.title()));
    }
}
