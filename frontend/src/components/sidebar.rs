use client::{Route, Session};
use yew::prelude::*;

use super::utils::{avatar_initial, display_name};

#[derive(Properties, PartialEq)]
pub struct SidebarProps {
    pub session: Session,
    pub active: Route,
    pub on_navigate: Callback<Route>,
    pub on_logout: Callback<()>,
    #[prop_or_default]
    pub logging_out: bool,
}

#[function_component(Sidebar)]
pub fn sidebar(props: &SidebarProps) -> Html {
    let nav_item = |route: Route, icon: &'static str| {
        let on_navigate = props.on_navigate.clone();
        let onclick = Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            on_navigate.emit(route);
        });
        html! {
            <li>
                <a
                    href={route.path()}
                    class={classes!("nav-link", (props.active == route).then_some("active"))}
                    {onclick}
                >
                    <i class={classes!("fa-solid", icon)}></i>{ format!(" {}", route.title()) }
                </a>
            </li>
        }
    };

    let on_logout = {
        let on_logout = props.on_logout.clone();
        Callback::from(move |_: MouseEvent| on_logout.emit(()))
    };

    html! {
        <aside class="sidebar">
            <div class="sidebar-user">
                <div class="avatar">{ avatar_initial(&props.session) }</div>
                <div class="user-details">
                    <span class="user-name">{ display_name(&props.session) }</span>
                    if let Some(email) = props.session.email() {
                        <span class="user-email">{ email }</span>
                    }
                </div>
            </div>
            <nav>
                <ul class="nav-list">
                    { nav_item(Route::Dashboard, "fa-eye") }
                    { nav_item(Route::History, "fa-clock-rotate-left") }
                    { nav_item(Route::Profile, "fa-user") }
                </ul>
            </nav>
            <button
                class="logout-button"
                onclick={on_logout}
                disabled={props.logging_out}
                title="Logout"
            >
                <i class="fa-solid fa-sign-out-alt"></i>
                { if props.logging_out { " Logging out..." } else { " Logout" } }
            </button>
        </aside>
    }
}
