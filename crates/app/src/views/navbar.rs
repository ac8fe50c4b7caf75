use agora_core::domain::identity::Identity;
use serde::Serialize;

const LINKS: [(&str, &str); 4] = [
    ("Home", "/"),
    ("Create Post", "/create"),
    ("Communities", "/communities"),
    ("Create Community", "/community/create"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub label: &'static str,
    pub href: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navbar {
    pub signed_in: bool,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub links: Vec<NavLink>,
}

impl Navbar {
    pub fn new(identity: &Identity) -> Self {
        let user = identity.user();
        Self {
            signed_in: identity.is_authenticated(),
            display_name: user.map(|user| user.display_name.clone()),
            avatar_url: user.and_then(|user| user.avatar_url.clone()),
            links: LINKS
                .iter()
                .map(|&(label, href)| NavLink { label, href })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use agora_core::domain::identity::{Identity, User};
    use uuid::Uuid;

    use super::Navbar;

    #[test]
    fn anonymous_navbar_has_links_but_no_user() {
        let nav = Navbar::new(&Identity::Anonymous);
        assert!(!nav.signed_in);
        assert_eq!(nav.display_name, None);
        let hrefs: Vec<_> = nav.links.iter().map(|link| link.href).collect();
        assert_eq!(hrefs, ["/", "/create", "/communities", "/community/create"]);
    }

    #[test]
    fn signed_in_navbar_shows_name_and_avatar() {
        let nav = Navbar::new(&Identity::Authenticated(User {
            id: Uuid::new_v4(),
            display_name: "Ada".to_string(),
            avatar_url: Some("https://cdn.example/ada.png".to_string()),
            access_token: "t".to_string(),
        }));
        assert!(nav.signed_in);
        assert_eq!(nav.display_name.as_deref(), Some("Ada"));
        assert!(nav.avatar_url.is_some());
    }
}
