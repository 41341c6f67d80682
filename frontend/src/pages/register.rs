use client::{Registration, Route};
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use crate::components::utils::render_error_message;
use crate::services::Services;

const GENDERS: [&str; 3] = ["Male", "Female", "Other"];

#[derive(Properties, PartialEq)]
pub struct RegisterProps {
    pub services: Services,
    pub on_navigate: Callback<Route>,
}

#[derive(Clone, Default, PartialEq)]
struct Form {
    name: String,
    age: String,
    gender: String,
    email: String,
    password: String,
}

impl Form {
    fn registration(&self) -> Result<Registration, String> {
        let age = self
            .age
            .trim()
            .parse::<u32>()
            .map_err(|_| "Please enter a valid age.".to_string())?;
        let registration = Registration {
            name: self.name.clone(),
            age,
            gender: self.gender.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        };
        registration.validate().map_err(|e| e.user_message())?;
        Ok(registration)
    }
}

#[function_component(Register)]
pub fn register(props: &RegisterProps) -> Html {
    let form = use_state(Form::default);
    let error = use_state(|| None::<String>);
    let submitting = use_state(|| false);

    let text_input = |update: fn(&mut Form, String)| {
        let form = form.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            let mut next = (*form).clone();
            update(&mut next, input.value());
            form.set(next);
        })
    };

    let on_gender = {
        let form = form.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            let mut next = (*form).clone();
            next.gender = select.value();
            form.set(next);
        })
    };

    let on_submit = {
        let session = props.services.session.clone();
        let on_navigate = props.on_navigate.clone();
        let form = form.clone();
        let error = error.clone();
        let submitting = submitting.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *submitting {
                return;
            }
            let registration = match form.registration() {
                Ok(registration) => registration,
                Err(message) => {
                    error.set(Some(message));
                    return;
                }
            };

            let session = session.clone();
            let on_navigate = on_navigate.clone();
            let error = error.clone();
            let submitting = submitting.clone();

            spawn_local(async move {
                submitting.set(true);
                error.set(None);
                match session.register(&registration).await {
                    Ok(identity) => {
                        log::info!("Registered {}", identity.uid);
                        on_navigate.emit(Route::Dashboard);
                    }
                    Err(e) => error.set(Some(e.user_message())),
                }
                submitting.set(false);
            });
        })
    };

    let to_login = {
        let on_navigate = props.on_navigate.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            on_navigate.emit(Route::Login);
        })
    };

    html! {
        <div class="auth-page">
            <form class="auth-card" onsubmit={on_submit}>
                <h1><i class="fa-solid fa-user-plus"></i>{" Create an account"}</h1>

                { render_error_message(error.as_deref()) }

                <label class="field">
                    <span>{"Full name"}</span>
                    <input
                        type="text"
                        autocomplete="name"
                        value={form.name.clone()}
                        oninput={text_input(|form, value| form.name = value)}
                    />
                </label>

                <label class="field">
                    <span>{"Age"}</span>
                    <input
                        type="number"
                        min="1"
                        max="130"
                        value={form.age.clone()}
                        oninput={text_input(|form, value| form.age = value)}
                    />
                </label>

                <label class="field">
                    <span>{"Gender"}</span>
                    <select onchange={on_gender}>
                        <option value="" selected={form.gender.is_empty()} disabled=true>
                            {"Select gender"}
                        </option>
                        { for GENDERS.iter().map(|gender| html! {
                            <option value={*gender} selected={form.gender == *gender}>{ *gender }</option>
                        }) }
                    </select>
                </label>

                <label class="field">
                    <span>{"Email"}</span>
                    <input
                        type="email"
                        autocomplete="email"
                        value={form.email.clone()}
                        oninput={text_input(|form, value| form.email = value)}
                    />
                </label>

                <label class="field">
                    <span>{"Password"}</span>
                    <input
                        type="password"
                        autocomplete="new-password"
                        value={form.password.clone()}
                        oninput={text_input(|form, value| form.password = value)}
                    />
                </label>

                <button type="submit" class="analyze-btn" disabled={*submitting}>
                    if *submitting {
                        <><i class="fa-solid fa-spinner fa-spin"></i>{" Creating account..."}</>
                    } else {
                        <><i class="fa-solid fa-user-plus"></i>{" Register"}</>
                    }
                </button>

                <p class="auth-switch">
                    {"Already have an account? "}
                    <a href={Route::Login.path()} onclick={to_login}>{"Login"}</a>
                </p>
            </form>
        </div>
    }
}
