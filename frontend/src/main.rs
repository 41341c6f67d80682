mod app;
mod components;
mod pages;
mod router;
mod services;
mod storage;
mod transport;

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<app::App>::new().render();
}
