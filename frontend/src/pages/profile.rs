use client::Session;
use yew::prelude::*;

use crate::components::utils::avatar_initial;

#[derive(Properties, PartialEq)]
pub struct ProfileProps {
    pub session: Session,
}

#[function_component(ProfilePage)]
pub fn profile_page(props: &ProfileProps) -> Html {
    let session = &props.session;

    let details = match session.profile() {
        Some(profile) => html! {
            <dl class="profile-details">
                <dt>{"Name"}</dt><dd>{ profile.name.clone() }</dd>
                <dt>{"Age"}</dt><dd>{ profile.age.to_string() }</dd>
                <dt>{"Gender"}</dt><dd>{ if profile.gender.is_empty() { "-" } else { profile.gender.as_str() } }</dd>
                <dt>{"Email"}</dt><dd>{ session.email().unwrap_or("-") }</dd>
            </dl>
        },
        None => html! {
            <>
                <p class="empty-state">{"Your profile details are not available."}</p>
                if let Some(email) = session.email() {
                    <p>{ format!("Signed in as {}", email) }</p>
                }
            </>
        },
    };

    html! {
        <section class="profile">
            <header class="page-header">
                <h1><i class="fa-solid fa-user"></i>{" Profile"}</h1>
            </header>
            <div class="profile-card">
                <div class="avatar avatar-large">{ avatar_initial(session) }</div>
                { details }
            </div>
        </section>
    }
}
