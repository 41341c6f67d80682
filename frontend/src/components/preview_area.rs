use yew::prelude::*;

use super::utils::debounce;
use crate::pages::dashboard::{Dashboard, Msg};

pub fn render_preview_area(model: &Dashboard, ctx: &Context<Dashboard>) -> Html {
    let Some(file) = &model.file else {
        return html! {};
    };

    let link = ctx.link().clone();

    html! {
        <div id="preview-container">
            {
                if let Some(url) = &model.preview_url {
                    html! { <img id="actual-image-preview" src={url.to_string()} alt={file.name()} /> }
                } else {
                    html! {
                        <div class="unavailable-preview">
                            <p>{"Preview unavailable"}</p>
                        </div>
                    }
                }
            }
            <div class="button-container">
                <button
                    id="clear-btn"
                    class="analyze-btn"
                    style="background-color: var(--clear-color);"
                    disabled={model.loading}
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::ClearFile)
                    })}
                >
                    <i class="fa-solid fa-trash"></i>{" Remove"}
                </button>
                <button
                    class="analyze-btn"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Analyze)
                    })}
                    disabled={model.loading}
                >
                    { render_analyze_button_content(model, &file.name()) }
                </button>
            </div>
        </div>
    }
}

fn render_analyze_button_content(model: &Dashboard, filename: &str) -> Html {
    if model.loading {
        html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Analyzing..."}</> }
    } else {
        let display_name = if filename.chars().count() > 20 {
            format!("{}...", filename.chars().take(17).collect::<String>())
        } else {
            filename.to_string()
        };

        html! { <><i class="fa-solid fa-magnifying-glass"></i>{ format!(" Analyze \"{}\"", display_name) }</> }
    }
}
