use crate::{ClassRef, MatchComponent, MatchState, ScopeResolver, Value, Visibility};

/// Enter `module` with default visibility `visibility` for the methods
/// defined after this point.
pub fn set_current_scope<R: ScopeResolver + ?Sized>(rt: &mut R, module: ClassRef, visibility: Visibility) {
    rt.set_current_scope(module, visibility);
}

/// `$&`, `` $` ``, `$'`, `$+` and `$1`..`$n`, by code. Nil when nothing
/// matched.
pub fn get_special<R: MatchState + ?Sized>(rt: &mut R, code: i8) -> Value {
    let backref = rt.last_match();
    if backref.is_nil() {
        return Value::NIL;
    }
    rt.match_component(backref, MatchComponent::from_code(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{ClassLayout, Sandbox};

    #[test]
    fn specials_without_match_are_nil() {
        let mut sb = Sandbox::default();
        for code in [b'&', b'`', b'\'', b'+', 1, 0xff] {
            assert_eq!(get_special(&mut sb, code as i8), Value::NIL);
        }
    }

    #[test]
    fn specials_read_last_match() {
        let mut sb = Sandbox::default();
        // "hello world" =~ /(o) (w)/
        sb.set_last_match("hello world", &[Some((4, 7)), Some((4, 5)), Some((6, 7))]);
        let text = |sb: &mut Sandbox, code: u8| {
            let value = get_special(sb, code as i8);
            sb.string_text(value)
        };
        assert_eq!(text(&mut sb, b'&').as_deref(), Some("o w"));
        assert_eq!(text(&mut sb, b'`').as_deref(), Some("hell"));
        assert_eq!(text(&mut sb, b'\'').as_deref(), Some("orld"));
        assert_eq!(text(&mut sb, b'+').as_deref(), Some("w"));
        assert_eq!(text(&mut sb, 1).as_deref(), Some("o"));
        // high bytes are negative groups, counted from the end
        assert_eq!(text(&mut sb, 0xff).as_deref(), Some("w"));
        assert_eq!(text(&mut sb, 0xfe).as_deref(), Some("o"));
        assert_eq!(get_special(&mut sb, 3), Value::NIL);
        assert_eq!(get_special(&mut sb, -4), Value::NIL);
    }

    #[test]
    fn scope_is_recorded() {
        let mut sb = Sandbox::default();
        let widget = sb.define_class("Widget", None, ClassLayout::Slots);
        set_current_scope(&mut sb, widget, Visibility::Private);
        assert_eq!(sb.visibility_of(widget), Some(Visibility::Private));
    }
}
