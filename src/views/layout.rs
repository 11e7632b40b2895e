use crate::views::state::MenuState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Logs,
    About,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Home, Page::Logs, Page::About];

    pub fn href(self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::Logs => "/logs",
            Page::About => "/about",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Logs => "Logs",
            Page::About => "About",
        }
    }
}

const STYLE: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; color: #1f2937; background: #f9fafb; }
nav { position: fixed; top: 0; width: 100%; background: #fff; border-bottom: 1px solid #e5e7eb; z-index: 20; }
.nav-bar { max-width: 1280px; margin: 0 auto; padding: 1rem; display: flex; justify-content: space-between; align-items: center; }
.nav-links a { color: #374151; padding: 0.5rem 1rem; border-radius: 0.375rem; text-decoration: none; }
.nav-links a:hover, .nav-links a.active { background: #ebf8ff; color: #1e40af; }
.logo { font-size: 1.5rem; font-weight: 700; color: #1341b1; text-decoration: none; }
.menu-toggle { display: none; }
.mobile-menu { list-style: none; margin: 0 1.25rem; padding: 0.5rem 0; }
.mobile-menu li { margin: 1rem 0; }
.mobile-menu a { color: black; opacity: 0.7; text-decoration: none; }
main { padding: 7rem 1.5rem 2rem; max-width: 1280px; margin: 0 auto; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 1rem; }
.card { padding: 1rem; border-radius: 0.75rem; border: 1px solid #d1d5db; background: #fff; box-shadow: 0 2px 4px rgba(0,0,0,0.05); }
.card.error { border-color: #fca5a5; background: #fef2f2; }
.filter-btn { display: inline-block; padding: 0.5rem 1rem; margin-right: 1rem; border-radius: 0.375rem; background: #e5e7eb; color: black; text-decoration: none; }
.filter-btn.active-logs { background: #1341b1; color: white; }
.filter-btn.active-errors { background: #ef4444; color: white; }
.notice { padding: 0.75rem 1rem; border-radius: 0.5rem; margin: 1rem 0; }
.notice.success { background: #dcfce7; } .notice.info { background: #e0f2fe; } .notice.failure { background: #fee2e2; }
.muted { color: #6b7280; font-style: italic; }
@media (max-width: 1023px) { .nav-links { display: none; } .menu-toggle { display: block; } }
"#;

const ICON_OPEN: &str = "M6 18L18 6M6 6l12 12";
const ICON_CLOSED: &str = "M4 6h16M4 12h16M4 18h16";

/// Wraps page content in the shared document, nav bar and mobile menu.
pub fn render_page(page: Page, menu: MenuState, extra_query: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>ClariaSense | {title}</title>
<style>{style}</style>
</head>
<body>
{nav}
<main>
{body}
</main>
</body>
</html>"#,
        title = page.title(),
        style = STYLE,
        nav = render_nav(page, menu, extra_query),
        body = body,
    )
}

fn render_nav(current: Page, menu: MenuState, extra_query: &str) -> String {
    let desktop: String = Page::ALL
        .iter()
        .map(|page| {
            let class = if *page == current { " class=\"active\"" } else { "" };
            format!(r#"<a href="{}"{}>{}</a>"#, page.href(), class, page.title())
        })
        .collect();

    let mobile = if menu.open {
        let items: String = Page::ALL
            .iter()
            .map(|page| format!(r#"<li><a href="{}">{}</a></li>"#, page.href(), page.title()))
            .collect();
        format!(r#"<ul class="mobile-menu">{}</ul>"#, items)
    } else {
        String::new()
    };

    let toggle_href = join_query(current.href(), menu.toggled().query(), extra_query);
    let icon = if menu.open { ICON_OPEN } else { ICON_CLOSED };

    format!(
        r#"<nav>
<div class="nav-bar">
<a class="logo" href="/">ClariaSense</a>
<a class="menu-toggle" href="{toggle_href}" title="Toggle Menu"><svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" fill="none" viewBox="0 0 24 24" stroke="currentColor"><path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="{icon}"/></svg></a>
<div class="nav-links">{desktop}</div>
</div>
{mobile}
</nav>"#,
        toggle_href = html_escape(&toggle_href),
        icon = icon,
        desktop = desktop,
        mobile = mobile,
    )
}

/// Appends `extra` (`key=value`, no leading separator) to a path that may already carry a query.
pub fn join_query(path: &str, query: &str, extra: &str) -> String {
    match (query.is_empty(), extra.is_empty()) {
        (_, true) => format!("{}{}", path, query),
        (true, false) => format!("{}?{}", path, extra),
        (false, false) => format!("{}{}&{}", path, query, extra),
    }
}

/// Escapes HTML special characters in interpolated text.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            html_escape(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_closed_menu_hides_mobile_links() {
        let html = render_page(Page::About, MenuState::default(), "", "<p>hi</p>");
        assert!(!html.contains("mobile-menu\">"));
        assert!(html.contains(r#"href="/about?menu=open""#));
        assert!(html.contains(ICON_CLOSED));
        assert!(html.contains(r#"<a href="/about" class="active">About</a>"#));
    }

    #[test]
    fn test_open_menu_lists_every_page() {
        let html = render_page(Page::Logs, MenuState { open: true }, "filter=errorLogs", "");
        assert!(html.contains(r#"<ul class="mobile-menu">"#));
        assert!(html.contains(r#"<li><a href="/logs">Logs</a></li>"#));
        // Closing the menu keeps the selected filter.
        assert!(html.contains(r#"href="/logs?filter=errorLogs""#));
        assert!(html.contains(ICON_OPEN));
    }

    #[test]
    fn test_join_query() {
        assert_eq!(join_query("/logs", "", ""), "/logs");
        assert_eq!(join_query("/logs", "?menu=open", ""), "/logs?menu=open");
        assert_eq!(join_query("/logs", "", "filter=logs"), "/logs?filter=logs");
        assert_eq!(join_query("/logs", "?menu=open", "filter=logs"), "/logs?menu=open&filter=logs");
    }
}
