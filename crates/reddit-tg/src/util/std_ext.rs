use easy_ext::ext;

pub(crate) mod prelude {
    pub(crate) use super::{ErrorExt as _, StrExt as _};
}

#[ext(ErrorExt)]
pub(crate) impl<E> E
where
    E: std::error::Error + ?Sized,
{
    fn display_chain(&self) -> display_error_chain::DisplayErrorChain<&Self> {
        display_error_chain::DisplayErrorChain::new(self)
    }
}

#[ext(StrExt)]
pub(crate) impl str {
    /// Cuts the string to at most `max_chars` characters, replacing the tail
    /// with an ellipsis if anything was cut.
    fn truncate_chars(&self, max_chars: usize) -> String {
        let mut chars = self.char_indices();
        match chars.nth(max_chars.saturating_sub(1)) {
            Some((idx, _)) if chars.next().is_some() => {
                format!("{}…", self[..idx].trim_end())
            }
            _ => self.to_owned(),
        }
    }
}
