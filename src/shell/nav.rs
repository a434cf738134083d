//! Bottom navigation entries

use crate::account::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavId {
    Home,
    Explore,
    Search,
    MyList,
    Profile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub id: NavId,
    pub label: &'static str,
    pub path: &'static str,
    pub active: bool,
    /// Dot shown on the profile entry while someone is logged in
    pub logged_in_indicator: bool,
}

const ENTRIES: [(NavId, &str, &str); 5] = [
    (NavId::Home, "Home", "/"),
    (NavId::Explore, "Explore", "/explore"),
    (NavId::Search, "Search", "/search"),
    (NavId::MyList, "My List", "/mylist"),
    (NavId::Profile, "Profil", "/profile"),
];

/// Root matches only itself; every other entry matches its subtree.
pub fn is_active(path: &str, current: &str) -> bool {
    if path == "/" {
        current == "/"
    } else {
        current.starts_with(path)
    }
}

pub fn nav_items(session: Option<&Session>, current_path: &str) -> Vec<NavItem> {
    let logged_in = session.is_some();
    ENTRIES
        .iter()
        .map(|&(id, label, path)| {
            let is_profile = id == NavId::Profile;
            NavItem {
                id,
                label: if is_profile && !logged_in { "Masuk" } else { label },
                path,
                active: is_active(path, current_path),
                logged_in_indicator: is_profile && logged_in,
            }
        })
        .collect()
}
