//! Server-rendered login page

use axum::response::Html;

pub const LOGIN_TITLE: &str = "Login | Light Switch";
pub const LOGIN_DESCRIPTION: &str = "Login to your Light Switch account";

/// Wrap page content in the login layout: page metadata plus a full-height
/// container centering a narrow column.
pub fn login_layout(children: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<meta name="description" content="{description}">
</head>
<body style="margin:0">
<div style="display:flex;min-height:100vh;align-items:center;justify-content:center;background-color:#f3f4f6">
<div style="width:100%;max-width:28rem">{children}</div>
</div>
</body>
</html>
"#,
        title = LOGIN_TITLE,
        description = LOGIN_DESCRIPTION,
        children = children,
    )
}

// The form posts to /auth/login and keeps the returned pair in localStorage.
const LOGIN_FORM: &str = r#"<form id="login-form" style="background:#fff;padding:2rem;border-radius:0.5rem;box-shadow:0 1px 3px rgba(0,0,0,0.1)">
<h1 style="margin-top:0">Sign in</h1>
<label>Username<br><input name="username" autocomplete="username" required></label><br><br>
<label>Password<br><input name="password" type="password" autocomplete="current-password" required></label><br><br>
<button type="submit">Login</button>
<p id="login-error" role="alert" style="color:#b91c1c"></p>
</form>
<script>
document.getElementById("login-form").addEventListener("submit", async (event) => {
  event.preventDefault();
  const form = new FormData(event.target);
  const response = await fetch("/auth/login", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ username: form.get("username"), password: form.get("password") }),
  });
  const body = await response.json();
  if (!response.ok) {
    document.getElementById("login-error").textContent = body.error;
    return;
  }
  localStorage.setItem("access_token", body.access_token);
  localStorage.setItem("refresh_token", body.refresh_token);
  window.location.assign("/");
});
</script>"#;

/// Login page endpoint
pub async fn login_page() -> Html<String> {
    Html(login_layout(LOGIN_FORM))
}
