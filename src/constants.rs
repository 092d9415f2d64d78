// Configuration
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_USER_AGENT: &str = "my-budget-client";
pub const ENV_API_URL: &str = "API_URL";
pub const ENV_SESSION_FILE: &str = "SESSION_FILE";
pub const ENV_USER_AGENT: &str = "USER_AGENT";

// CSRF handshake
pub const CSRF_COOKIE_PATH: &str = "/sanctum/csrf-cookie";
pub const XSRF_COOKIE_NAME: &str = "XSRF-TOKEN";
pub const XSRF_HEADER_NAME: &str = "X-XSRF-TOKEN";

// Auth endpoints
pub const USER_PATH: &str = "/api/user";
pub const USER_PROFILE_PATH: &str = "/api/user/profile";
pub const USER_PASSWORD_PATH: &str = "/api/user/password";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const LOGOUT_PATH: &str = "/logout";
pub const GOOGLE_AUTH_PATH: &str = "/auth/google";

// Resource endpoints
pub const CATEGORIES_PATH: &str = "/api/categories";
pub const DEPOSITS_PATH: &str = "/api/deposits";
pub const EXPENSES_PATH: &str = "/api/expenses";
pub const STATISTICS_PATH: &str = "/api/statistics";

// Session store fallback messages
pub const ERR_FETCH_USER: &str = "Failed to fetch user";
pub const ERR_LOGIN: &str = "Login failed";
pub const ERR_REGISTER: &str = "Registration failed";
pub const ERR_LOGOUT: &str = "Logout failed";
pub const ERR_UPDATE_PROFILE: &str = "Failed to update profile";
pub const ERR_UPDATE_PASSWORD: &str = "Failed to update password";

// Route names
pub const ROUTE_LANDING: &str = "landing";
pub const ROUTE_HOME: &str = "home";
pub const ROUTE_LOGIN: &str = "login";
pub const REDIRECT_QUERY_KEY: &str = "redirect";
