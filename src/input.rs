//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions.  Adding a new keybinding is
//! a single match arm in [`handle_key_event`].
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a `KeyCode` match arm in [`handle_key_event`] that calls it.
//! 3. Update the help text in `ui::draw_status_bar`.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::App;

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => app.next_tab(),
        KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => app.previous_tab(),
        KeyCode::Char(c @ '1'..='3') => app.select_tab(c as usize - '1' as usize),
        KeyCode::Char('r') => app.request_refresh(),
        KeyCode::Char('p') => app.toggle_auto_refresh(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crossterm::event::{KeyEventState, KeyModifiers};

    use crate::app::Tab;
    use crate::cache::tests::MockSource;
    use crate::config::Config;
    use crate::feeds::Feeds;

    fn app() -> App {
        App::new(Feeds::new(&Config::default(), MockSource::new(Duration::ZERO)))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn q_and_esc_quit() {
        for code in [KeyCode::Char('q'), KeyCode::Esc] {
            let mut app = app();
            handle_key_event(&mut app, press(code));
            assert!(app.quit);
        }
    }

    #[test]
    fn arrows_and_tab_switch_pages() {
        let mut app = app();
        handle_key_event(&mut app, press(KeyCode::Tab));
        assert_eq!(app.tab, Tab::Futures);
        handle_key_event(&mut app, press(KeyCode::Right));
        assert_eq!(app.tab, Tab::Mining);
        handle_key_event(&mut app, press(KeyCode::Left));
        assert_eq!(app.tab, Tab::Futures);
        handle_key_event(&mut app, press(KeyCode::BackTab));
        assert_eq!(app.tab, Tab::Market);
    }

    #[test]
    fn digits_jump_to_tab() {
        let mut app = app();
        handle_key_event(&mut app, press(KeyCode::Char('3')));
        assert_eq!(app.tab, Tab::Mining);
        handle_key_event(&mut app, press(KeyCode::Char('1')));
        assert_eq!(app.tab, Tab::Market);
    }

    #[test]
    fn r_requests_refresh() {
        let mut app = app();
        handle_key_event(&mut app, press(KeyCode::Char('r')));
        assert!(app.take_refresh_request());
    }

    #[test]
    fn key_release_is_ignored() {
        let mut app = app();
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        handle_key_event(&mut app, release);
        assert!(!app.quit);
    }
}
