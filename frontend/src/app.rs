use client::{ClientConfig, GuardDecision, Route, RouteKind, SessionSnapshot, Subscription, decide};
use gloo_events::EventListener;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::components::sidebar::Sidebar;
use crate::pages::dashboard::Dashboard;
use crate::pages::history::HistoryPage;
use crate::pages::login::Login;
use crate::pages::profile::ProfilePage;
use crate::pages::register::Register;
use crate::router;
use crate::services::Services;

pub enum Msg {
    SessionChanged(SessionSnapshot),
    Navigate(Route),
    LocationChanged(Route),
    Logout,
    LogoutFinished(Option<String>),
}

pub struct App {
    services: Services,
    snapshot: SessionSnapshot,
    route: Route,
    current_uid: Option<String>,
    logging_out: bool,
    error: Option<String>,
    _session_subscription: Subscription,
    _popstate_listener: Option<EventListener>,
}

impl Component for App {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let services = Services::new(&ClientConfig::from_build_env());

        let session_subscription = {
            let link = ctx.link().clone();
            services
                .session
                .subscribe(move |snapshot| link.send_message(Msg::SessionChanged(snapshot.clone())))
        };

        {
            let session = services.session.clone();
            spawn_local(async move { session.run().await });
        }

        let popstate_listener = web_sys::window().map(|window| {
            let link = ctx.link().clone();
            EventListener::new(&window, "popstate", move |_| {
                link.send_message(Msg::LocationChanged(router::current_route()));
            })
        });

        Self {
            snapshot: services.session.snapshot(),
            services,
            route: router::current_route(),
            current_uid: None,
            logging_out: false,
            error: None,
            _session_subscription: session_subscription,
            _popstate_listener: popstate_listener,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::SessionChanged(snapshot) => {
                let uid = snapshot.session.identity().map(|identity| identity.uid.clone());
                if uid != self.current_uid {
                    log::info!("Session subject changed; starting a new history lifetime");
                    self.services.history.reset();
                    self.current_uid = uid;
                }
                self.snapshot = snapshot;
                self.enforce_guard();
                true
            }
            Msg::Navigate(route) => {
                if route != self.route {
                    router::push(route);
                    self.route = route;
                }
                self.error = None;
                self.enforce_guard();
                true
            }
            Msg::LocationChanged(route) => {
                self.route = route;
                self.enforce_guard();
                true
            }
            Msg::Logout => {
                if self.logging_out {
                    return false;
                }
                self.logging_out = true;
                let session = self.services.session.clone();
                let link = ctx.link().clone();
                spawn_local(async move {
                    match session.logout().await {
                        Ok(()) => link.send_message(Msg::LogoutFinished(None)),
                        Err(e) => link.send_message(Msg::LogoutFinished(Some(e.user_message()))),
                    }
                });
                true
            }
            Msg::LogoutFinished(error) => {
                self.logging_out = false;
                match error {
                    None => ctx.link().send_message(Msg::Navigate(Route::Login)),
                    Some(message) => self.error = Some(message),
                }
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        if !self.snapshot.resolved {
            return html! {
                <div class="splash">
                    <i class="fa-solid fa-spinner fa-spin fa-2x"></i>
                    <p>{"Loading..."}</p>
                </div>
            };
        }

        let on_navigate = ctx.link().callback(Msg::Navigate);
        let services = self.services.clone();
        let session = self.snapshot.session.clone();

        let page = match self.route {
            Route::Login => {
                let notice = self
                    .snapshot
                    .error
                    .as_ref()
                    .map(|_| "We could not restore your session. Please log in again.".to_string());
                return html! { <Login {services} {on_navigate} {notice} /> };
            }
            Route::Register => return html! { <Register {services} {on_navigate} /> },
            Route::NotFound => return self.render_not_found(ctx),
            // Redirected by the guard before rendering.
            Route::Root => return html! {},
            Route::Dashboard => html! { <Dashboard services={services.clone()} session={session.clone()} /> },
            Route::History => html! { <HistoryPage services={services.clone()} /> },
            Route::Profile => html! { <ProfilePage session={session.clone()} /> },
        };

        if self.route.kind() == RouteKind::Protected && !session.is_authenticated() {
            return html! {};
        }

        html! {
            <div class="layout">
                <Sidebar
                    session={session}
                    active={self.route}
                    on_navigate={on_navigate}
                    on_logout={ctx.link().callback(|_| Msg::Logout)}
                    logging_out={self.logging_out}
                />
                <main class="main-content">
                    if let Some(error) = &self.error {
                        <div class="error-message">
                            <i class="fa-solid fa-circle-exclamation"></i>
                            <p>{ error }</p>
                        </div>
                    }
                    { page }
                </main>
            </div>
        }
    }
}

impl App {
    /// Applies the route guard once the session has been resolved.
    fn enforce_guard(&mut self) {
        if !self.snapshot.resolved {
            return;
        }
        if let GuardDecision::RedirectTo(target) = decide(&self.snapshot.session, self.route) {
            log::debug!("Redirecting {} to {}", self.route.path(), target.path());
            router::replace(target);
            self.route = target;
        }
    }

    fn render_not_found(&self, ctx: &Context<Self>) -> Html {
        let target = if self.snapshot.session.is_authenticated() {
            Route::Dashboard
        } else {
            Route::Login
        };
        let onclick = ctx.link().callback(move |e: MouseEvent| {
            e.prevent_default();
            Msg::Navigate(target)
        });

        html! {
            <div class="not-found">
                <h1>{"404"}</h1>
                <p>{"The page you are looking for does not exist."}</p>
                <a href={target.path()} {onclick}>{ format!("Go to {}", target.title()) }</a>
            </div>
        }
    }
}
