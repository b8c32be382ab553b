//! Creator selection.
//!
//! Exactly one creator handles a run: the delegating creator whenever the
//! host ships its own environment builder (unless the user forced the
//! builtin path), otherwise the first builtin flavor that can describe the
//! interpreter. Flavors are records of functions in a dispatch table rather
//! than a class hierarchy.

use vpy_domain::{Interpreter, UserOptions};

use crate::create::flavors::{BuiltinFlavor, FLAVORS};
use crate::errors::VenvError;

#[derive(Clone, Copy, Debug)]
pub enum Creator {
    /// Drive the host's own `venv` module, then overlay our additions.
    Delegating,
    Builtin(&'static BuiltinFlavor),
}

impl Creator {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Creator::Delegating => "venv-delegate",
            Creator::Builtin(flavor) => flavor.name,
        }
    }
}

pub fn select(interpreter: &Interpreter, options: &UserOptions) -> Result<Creator, VenvError> {
    if interpreter.has_venv && !options.force_builtin {
        return Ok(Creator::Delegating);
    }
    for flavor in FLAVORS {
        if (flavor.can_describe)(interpreter) {
            return Ok(Creator::Builtin(flavor));
        }
    }
    Err(VenvError::NoCreatorFor {
        interpreter: interpreter.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{cpython, cpython_windows, pypy};
    use vpy_domain::Implementation;

    fn options() -> UserOptions {
        UserOptions::new("/tmp/env")
    }

    #[test]
    fn venv_hosts_delegate_by_default() {
        let interpreter = cpython(3, 11);
        assert!(matches!(
            select(&interpreter, &options()).unwrap(),
            Creator::Delegating
        ));
    }

    #[test]
    fn force_builtin_overrides_delegation() {
        let interpreter = cpython(3, 11);
        let mut options = options();
        options.force_builtin = true;
        let creator = select(&interpreter, &options).unwrap();
        assert_eq!(creator.name(), "cpython3-posix");
    }

    #[test]
    fn python2_gets_the_builtin_posix_creator() {
        let mut interpreter = cpython(2, 7);
        interpreter.has_venv = false;
        let creator = select(&interpreter, &options()).unwrap();
        assert_eq!(creator.name(), "cpython2-posix");
    }

    #[test]
    fn windows_python2_creator() {
        let mut interpreter = cpython_windows(2, 7);
        interpreter.has_venv = false;
        let creator = select(&interpreter, &options()).unwrap();
        assert_eq!(creator.name(), "cpython2-windows");
    }

    #[test]
    fn mac_framework_takes_priority_over_plain_posix() {
        let mut interpreter = cpython(3, 11);
        interpreter.has_venv = false;
        interpreter.platform = "darwin".into();
        interpreter
            .sysconfig_vars
            .insert("PYTHONFRAMEWORK".into(), Some("Python3".into()));
        let creator = select(&interpreter, &options()).unwrap();
        assert_eq!(creator.name(), "cpython3-mac-framework");
    }

    #[test]
    fn pypy_without_venv_uses_builtin() {
        let mut interpreter = pypy(3, 10);
        interpreter.has_venv = false;
        let creator = select(&interpreter, &options()).unwrap();
        assert_eq!(creator.name(), "pypy3-posix");
    }

    #[test]
    fn windows_store_python_is_rejected() {
        let mut interpreter = cpython_windows(3, 11);
        interpreter.has_venv = false;
        interpreter.prefix = "C:/Users/u/AppData/Local/Microsoft/WindowsApps/x".into();
        let error = select(&interpreter, &options()).unwrap_err();
        assert!(matches!(error, VenvError::NoCreatorFor { .. }));
    }

    #[test]
    fn unknown_implementation_has_no_creator() {
        let mut interpreter = cpython(3, 11);
        interpreter.has_venv = false;
        interpreter.implementation = Implementation::Other("GraalVM".into());
        assert!(select(&interpreter, &options()).is_err());
    }
}
