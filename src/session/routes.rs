//! Client-side route prefixes that stay reachable without credentials, plus the
//! navigation seam used for redirects.

/// Route prefixes that suppress the redirect-to-login on refresh failure: the login
/// form, the password-reset pair, and the public share-link view.
pub const UNAUTHENTICATED_PREFIXES: &[&str] =
	&["/login", "/forgot-password", "/reset-password", "/share"];

/// Returns true when the path sits under an unauthenticated-allowed prefix.
///
/// Matching is prefix-per-segment: `/login` and `/login/sso` match, `/loginx` does not.
pub fn is_unauthenticated_path(path: &str) -> bool {
	UNAUTHENTICATED_PREFIXES.iter().any(|prefix| {
		path.strip_prefix(prefix).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
	})
}

/// Navigation sink the coordinator drives for server-declared redirects and for the
/// login bounce after a failed refresh.
///
/// Browser embeddings map this onto the location bar; headless embeddings use
/// [`NoopNavigator`] and react to the returned errors instead.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Returns the current client-side path.
	fn current_path(&self) -> String;

	/// Performs a full navigation to the provided location.
	fn assign(&self, location: &str);
}

/// Navigator for embeddings that cannot (or should not) navigate.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;
impl Navigator for NoopNavigator {
	fn current_path(&self) -> String {
		"/".into()
	}

	fn assign(&self, _location: &str) {}
}
