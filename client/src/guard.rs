//! Route access decisions, independent of any rendering framework.

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Root,
    Login,
    Register,
    Dashboard,
    History,
    Profile,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Public,
    Protected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectTo(Route),
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::History => "/history",
            Route::Profile => "/profile",
            Route::NotFound => "/404",
        }
    }

    /// Trailing slashes, query strings and fragments are ignored.
    pub fn from_path(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Root,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/dashboard" => Route::Dashboard,
            "/history" => Route::History,
            "/profile" => Route::Profile,
            _ => Route::NotFound,
        }
    }

    pub fn kind(self) -> RouteKind {
        match self {
            Route::Dashboard | Route::History | Route::Profile => RouteKind::Protected,
            Route::Root | Route::Login | Route::Register | Route::NotFound => RouteKind::Public,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Route::Root | Route::Login => "Login",
            Route::Register => "Register",
            Route::Dashboard => "Dashboard",
            Route::History => "History",
            Route::Profile => "Profile",
            Route::NotFound => "Not Found",
        }
    }
}

pub fn guard(session: &Session, kind: RouteKind) -> GuardDecision {
    match kind {
        RouteKind::Protected if !session.is_authenticated() => GuardDecision::RedirectTo(Route::Login),
        RouteKind::Protected | RouteKind::Public => GuardDecision::Allow,
    }
}

/// `guard` plus the root alias, which always lands on the login page.
pub fn decide(session: &Session, route: Route) -> GuardDecision {
    match route {
        Route::Root => GuardDecision::RedirectTo(Route::Login),
        other => guard(session, other.kind()),
    }
}
