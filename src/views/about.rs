use crate::views::layout::{render_page, Page};
use crate::views::state::MenuState;

pub fn render_about(menu: MenuState) -> String {
    let body = r#"<section>
<h1>About ClariaSense</h1>
<p>ClariaSense watches the water in your aquarium around the clock. Probes for pH,
total dissolved solids (TDS) and temperature report to the cloud, where the latest
values appear on the dashboard as soon as they change.</p>
<p>Every hour the readings are summarised into a log, and any value that leaves its
safe range is recorded as an out-of-parameter event so you can see what happened
and when.</p>
</section>"#;

    render_page(Page::About, menu, "", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_about_page() {
        let html = render_about(MenuState::default());
        assert!(html.contains("<title>ClariaSense | About</title>"));
        assert!(html.contains("About ClariaSense"));
    }
}
