use serde::Serialize;

use super::session::Session;
use crate::core::shared::enums::UserRole;
use crate::security::auth_api::{can_read, Module};

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Route {
    pub path: &'static str,
    pub title: &'static str,
    /// `None` for pages open to every signed-in user.
    pub module: Option<Module>,
}

const fn route(path: &'static str, title: &'static str, module: Option<Module>) -> Route {
    Route {
        path,
        title,
        module,
    }
}

pub const ROUTES: &[Route] = &[
    route("/", "Dashboard", None),
    route("/companies", "Companies", Some(Module::Crm)),
    route("/contacts", "Contacts", Some(Module::Crm)),
    route("/leads", "Leads", Some(Module::Crm)),
    route("/deals", "Deals", Some(Module::Crm)),
    route("/activities", "Activities", Some(Module::Crm)),
    route("/employees", "Employees", Some(Module::Hr)),
    route("/departments", "Departments", Some(Module::Hr)),
    route("/designations", "Designations", Some(Module::Hr)),
    route("/leave-types", "Leave Types", Some(Module::Hr)),
    route("/leave-requests", "Leave Requests", Some(Module::Hr)),
    route("/projects", "Projects", Some(Module::Projects)),
    route("/tasks", "Tasks", Some(Module::Projects)),
    route("/users", "Users", Some(Module::Users)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    RedirectToLogin,
    Forbidden,
}

impl Route {
    pub fn is_visible_to(&self, role: UserRole) -> bool {
        self.module.map_or(true, |module| can_read(role, module))
    }
}

pub fn find_route(path: &str) -> Option<&'static Route> {
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    ROUTES.iter().find(|r| r.path == path)
}

/// Menu entries for `role`, in menu order.
pub fn visible_routes(role: UserRole) -> Vec<&'static Route> {
    ROUTES.iter().filter(|r| r.is_visible_to(role)).collect()
}

/// Whether the page at `path` may be shown. Paths outside the table only
/// need a session.
pub fn guard(path: &str, session: Option<&Session>) -> Access {
    if path == LOGIN_PATH {
        return Access::Allowed;
    }
    let Some(session) = session else {
        return Access::RedirectToLogin;
    };
    match find_route(path) {
        Some(route) if !route.is_visible_to(session.user.role) => Access::Forbidden,
        _ => Access::Allowed,
    }
}
