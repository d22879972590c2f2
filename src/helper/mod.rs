pub mod alert_helpers;
pub mod approval_helpers;
pub mod permission_helpers;
pub mod redirect_helpers;
pub mod sanitization_helpers;
pub mod settings_helpers;
pub mod template_helpers;

#[cfg(test)]
pub mod test_support;
