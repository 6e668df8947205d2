use crate::mailer::OutgoingEmail;

pub const SUBJECT: &str = "Email Verification";

/// Verification mail carrying the one-time code. `username` is already restricted
/// to `[A-Za-z0-9_]` and `code` to digits, so both are safe to inline.
pub fn verification_email(to: &str, username: &str, code: &str, ttl_minutes: i64) -> OutgoingEmail {
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en" dir="ltr">
  <head>
    <meta charset="utf-8">
    <title>Verification Code</title>
  </head>
  <body style="font-family: Roboto, Verdana, sans-serif;">
    <div style="max-width: 576px; margin: 0 auto; padding: 32px; text-align: center;">
      <h1>Verify Your Account, {username}</h1>
      <p>Your Verification Code is:</p>
      <p style="font-size: 30px; font-weight: bold; letter-spacing: 4px;">{code}</p>
      <p>To complete your registration, please enter this code on our verification page.</p>
      <p><em>This code will expire in {ttl_minutes} minutes.</em></p>
      <hr>
      <p style="font-size: 12px; color: #6b7280;">
        If you did not request this verification, please ignore this email.
      </p>
    </div>
  </body>
</html>
"#
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: SUBJECT.to_string(),
        html,
    }
}
