use client::Route;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::components::utils::render_error_message;
use crate::services::Services;

#[derive(Properties, PartialEq)]
pub struct LoginProps {
    pub services: Services,
    pub on_navigate: Callback<Route>,
    /// Shown when the last session could not be restored.
    #[prop_or_default]
    pub notice: Option<String>,
}

#[function_component(Login)]
pub fn login(props: &LoginProps) -> Html {
    let email = use_state(String::new);
    let password = use_state(String::new);
    let error = use_state(|| None::<String>);
    let submitting = use_state(|| false);

    let on_email = {
        let email = email.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            email.set(input.value());
        })
    };

    let on_password = {
        let password = password.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            password.set(input.value());
        })
    };

    let on_submit = {
        let session = props.services.session.clone();
        let on_navigate = props.on_navigate.clone();
        let email = email.clone();
        let password = password.clone();
        let error = error.clone();
        let submitting = submitting.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *submitting {
                return;
            }
            if email.trim().is_empty() || password.is_empty() {
                error.set(Some("Please enter your email and password.".to_string()));
                return;
            }

            let session = session.clone();
            let on_navigate = on_navigate.clone();
            let email = (*email).clone();
            let password = (*password).clone();
            let error = error.clone();
            let submitting = submitting.clone();

            spawn_local(async move {
                submitting.set(true);
                error.set(None);
                match session.login(&email, &password).await {
                    Ok(()) => on_navigate.emit(Route::Dashboard),
                    Err(e) => error.set(Some(e.user_message())),
                }
                submitting.set(false);
            });
        })
    };

    let to_register = {
        let on_navigate = props.on_navigate.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            on_navigate.emit(Route::Register);
        })
    };

    let shown_error = error.as_deref().or(props.notice.as_deref());

    html! {
        <div class="auth-page">
            <form class="auth-card" onsubmit={on_submit}>
                <h1><i class="fa-solid fa-eye"></i>{" DR Screening"}</h1>
                <p class="subtitle">{"Log in to analyze retinal images"}</p>

                { render_error_message(shown_error) }

                <label class="field">
                    <span>{"Email"}</span>
                    <input
                        type="email"
                        autocomplete="email"
                        value={(*email).clone()}
                        oninput={on_email}
                    />
                </label>

                <label class="field">
                    <span>{"Password"}</span>
                    <input
                        type="password"
                        autocomplete="current-password"
                        value={(*password).clone()}
                        oninput={on_password}
                    />
                </label>

                <button type="submit" class="analyze-btn" disabled={*submitting}>
                    if *submitting {
                        <><i class="fa-solid fa-spinner fa-spin"></i>{" Logging in..."}</>
                    } else {
                        <><i class="fa-solid fa-right-to-bracket"></i>{" Login"}</>
                    }
                </button>

                <p class="auth-switch">
                    {"Don't have an account? "}
                    <a href={Route::Register.path()} onclick={to_register}>{"Register"}</a>
                </p>
            </form>
        </div>
    }
}
