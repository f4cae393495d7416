/// Single-line text input used by the task form, quick search and name prompts.
///
/// The cursor is a char index, so multi-byte input is edited by character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Editor {
    chars: Vec<char>,
    pub cursor: usize,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Editor holding `content` with the cursor at the end
    pub fn from_string(content: impl AsRef<str>) -> Self {
        let chars: Vec<char> = content.as_ref().chars().filter(|c| *c != '\n').collect();
        let cursor = chars.len();
        Self { chars, cursor }
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn is_blank(&self) -> bool {
        self.chars.iter().all(|c| c.is_whitespace())
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' || ch == '\r' {
            return;
        }
        self.cursor = self.cursor.min(self.chars.len());
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
    }

    /// Backspace
    pub fn delete_char(&mut self) {
        if self.cursor == 0 || self.chars.is_empty() {
            return;
        }
        self.cursor = self.cursor.min(self.chars.len());
        self.chars.remove(self.cursor - 1);
        self.cursor -= 1;
    }

    /// Delete key
    pub fn delete_forward(&mut self) {
        if self.cursor < self.chars.len() {
            self.chars.remove(self.cursor);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.chars.len());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.chars.len();
    }

    /// The slice of text that fits in `width` columns and the cursor's
    /// column within it; scrolls horizontally to keep the cursor visible
    pub fn visible(&self, width: usize) -> (String, usize) {
        if width == 0 {
            return (String::new(), 0);
        }
        let cursor = self.cursor.min(self.chars.len());
        let start = (cursor + 1).saturating_sub(width);
        let end = (start + width).min(self.chars.len());
        (self.chars[start..end].iter().collect(), cursor - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_at_cursor() {
        let mut editor = Editor::from_string("helo");
        editor.move_cursor_left();
        editor.insert_char('l');
        assert_eq!(editor.text(), "hello");
        assert_eq!(editor.cursor, 4);
    }

    #[test]
    fn backspace_and_delete() {
        let mut editor = Editor::from_string("abc");
        editor.delete_char();
        assert_eq!(editor.text(), "ab");
        editor.move_cursor_home();
        editor.delete_char();
        assert_eq!(editor.text(), "ab");
        editor.delete_forward();
        assert_eq!(editor.text(), "b");
    }

    #[test]
    fn newlines_are_ignored() {
        let mut editor = Editor::from_string("a\nb");
        editor.insert_char('\n');
        assert_eq!(editor.text(), "ab");
    }

    #[test]
    fn multibyte_characters_edit_by_char() {
        let mut editor = Editor::from_string("café");
        editor.delete_char();
        assert_eq!(editor.text(), "caf");
        assert_eq!(editor.len(), 3);
    }

    #[test]
    fn visible_window_follows_cursor() {
        let editor = Editor::from_string("abcdefgh");
        let (text, col) = editor.visible(4);
        assert_eq!(text, "fgh");
        assert_eq!(col, 3);

        let mut editor = editor;
        editor.move_cursor_home();
        let (text, col) = editor.visible(4);
        assert_eq!(text, "abcd");
        assert_eq!(col, 0);
    }

    #[test]
    fn blank_detection() {
        assert!(Editor::from_string("   ").is_blank());
        assert!(!Editor::from_string(" x ").is_blank());
    }
}
