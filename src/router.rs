use crate::constants::*;
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub requires_guest: bool,
}

const PUBLIC: RouteMeta = RouteMeta {
    requires_auth: false,
    requires_guest: false,
};
const AUTH: RouteMeta = RouteMeta {
    requires_auth: true,
    requires_guest: false,
};
const GUEST: RouteMeta = RouteMeta {
    requires_auth: false,
    requires_guest: true,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    /// Pattern; `:name` segments capture a parameter
    pub path: &'static str,
    pub meta: RouteMeta,
}

const fn route(name: &'static str, path: &'static str, meta: RouteMeta) -> Route {
    Route { name, path, meta }
}

/// Application routes. Earlier entries win when two patterns match.
pub const ROUTES: &[Route] = &[
    route(ROUTE_LANDING, "/", PUBLIC),
    route(ROUTE_HOME, "/dashboard", AUTH),
    route("statistics", "/statistics", AUTH),
    route("expenses", "/expenses", AUTH),
    route("expense-create", "/expenses/create", AUTH),
    route("expense-details", "/expenses/:id", AUTH),
    route("expense-edit", "/expenses/:id/edit", AUTH),
    route("categories", "/categories", AUTH),
    route("category-create", "/categories/create", AUTH),
    route("category-details", "/categories/:id", AUTH),
    route("category-edit", "/categories/:id/edit", AUTH),
    route("deposits", "/deposits", AUTH),
    route("deposit-create", "/deposits/create", AUTH),
    route("deposit-details", "/deposits/:id", AUTH),
    route("deposit-edit", "/deposits/:id/edit", AUTH),
    route(ROUTE_LOGIN, "/login", GUEST),
    route("register", "/register", GUEST),
    route("profile", "/profile", AUTH),
];

/// A concrete location matched against [`ROUTES`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub name: &'static str,
    /// Path as requested, including any query string
    pub full_path: String,
    pub params: Vec<(String, String)>,
    pub meta: RouteMeta,
}

impl RouteMatch {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn match_route(route: &Route, path: &str) -> Option<Vec<(String, String)>> {
    let pattern = segments(route.path);
    let actual = segments(path);
    if pattern.len() != actual.len() {
        return None;
    }

    let mut params = Vec::new();
    for (expected, value) in pattern.iter().zip(actual.iter()) {
        match expected.strip_prefix(':') {
            Some(key) => params.push((key.to_string(), value.to_string())),
            None if expected == value => {}
            None => return None,
        }
    }
    Some(params)
}

/// Matches a path (query string and fragment ignored) against the route table.
pub fn resolve(full_path: &str) -> Option<RouteMatch> {
    let path = full_path.split(['?', '#']).next().unwrap_or_default();

    ROUTES.iter().find_map(|route| {
        match_route(route, path).map(|params| RouteMatch {
            name: route.name,
            full_path: full_path.to_string(),
            params,
            meta: route.meta,
        })
    })
}

pub fn path_for(name: &str) -> Option<&'static str> {
    ROUTES.iter().find(|r| r.name == name).map(|r| r.path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect {
        name: &'static str,
        query: Vec<(String, String)>,
    },
}

impl Navigation {
    /// Location to go to instead, as a path with an encoded query string.
    pub fn redirect_location(&self) -> Option<String> {
        let Navigation::Redirect { name, query } = self else {
            return None;
        };
        let path = path_for(name)?;
        if query.is_empty() {
            return Some(path.to_string());
        }
        let query = query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        Some(format!("{}?{}", path, query))
    }
}

/// Pure guard decision for a navigation to `to`.
pub fn decide(is_authenticated: bool, to: &RouteMatch) -> Navigation {
    if to.meta.requires_auth && !is_authenticated {
        return Navigation::Redirect {
            name: ROUTE_LOGIN,
            query: vec![(REDIRECT_QUERY_KEY.to_string(), to.full_path.clone())],
        };
    }

    if to.meta.requires_guest && is_authenticated {
        return Navigation::Redirect {
            name: ROUTE_HOME,
            query: Vec::new(),
        };
    }

    if to.name == ROUTE_LANDING && is_authenticated {
        return Navigation::Redirect {
            name: ROUTE_HOME,
            query: Vec::new(),
        };
    }

    Navigation::Proceed
}

/// Allows or redirects route transitions based on the session.
#[derive(Clone, Debug)]
pub struct NavigationGuard {
    session: SessionStore,
}

impl NavigationGuard {
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }

    /// Tries to load the user first when none is known yet; a failed load
    /// simply leaves the session anonymous.
    pub async fn before_each(&self, to: &RouteMatch) -> Navigation {
        if !self.session.is_authenticated().await {
            self.session.fetch_user().await;
        }
        decide(self.session.is_authenticated().await, to)
    }

    /// Resolves `path` and runs the guard. `None` for unknown paths.
    pub async fn navigate(&self, path: &str) -> Option<Navigation> {
        let to = resolve(path)?;
        Some(self.before_each(&to).await)
    }
}
