//! Runtime template compiler registration.
//!
//! The runtime does not parse templates itself. A compiler is registered per
//! thread and turns a component's template into a [`RenderFn`] the first time
//! that component is set up.

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::RenderFn;
use crate::error::Result;

/// Compiles template source into a render function.
pub trait TemplateCompiler {
    fn compile(&self, template: &str) -> Result<RenderFn>;
}

impl<F> TemplateCompiler for F
where
    F: Fn(&str) -> Result<RenderFn>,
{
    fn compile(&self, template: &str) -> Result<RenderFn> {
        self(template)
    }
}

thread_local! {
    static COMPILER: RefCell<Option<Rc<dyn TemplateCompiler>>> = const { RefCell::new(None) };
}

/// Register the compiler used for components that only have a template.
/// Replaces any previous registration on this thread.
pub fn register_runtime_compiler(compiler: Rc<dyn TemplateCompiler>) {
    COMPILER.with(|slot| *slot.borrow_mut() = Some(compiler));
    tracing::debug!("runtime compiler registered");
}

pub(crate) fn runtime_compiler() -> Option<Rc<dyn TemplateCompiler>> {
    COMPILER.with(|slot| slot.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::PublicInstance;
    use crate::error::RuntimeError;
    use crate::vnode::h;

    fn tiny_compiler(template: &str) -> Result<RenderFn> {
        // Accepts `<tag>text</tag>` only.
        let open = template
            .strip_prefix('<')
            .and_then(|rest| rest.split_once('>'))
            .map(|(tag, rest)| (tag.to_string(), rest.to_string()));
        let Some((tag, rest)) = open else {
            return Err(RuntimeError::Template { tag: String::new() });
        };
        let closing = format!("</{tag}>");
        let Some(text) = rest.strip_suffix(&closing) else {
            return Err(RuntimeError::Template { tag });
        };
        let text = text.to_string();
        Ok(Rc::new(move |_: &PublicInstance| h(tag.as_str(), None, text.clone())))
    }

    #[test]
    fn test_register_and_compile() {
        assert!(runtime_compiler().is_none());
        register_runtime_compiler(Rc::new(tiny_compiler));

        let Some(compiler) = runtime_compiler() else {
            panic!("compiler should be registered");
        };
        assert!(compiler.compile("<p>hi</p>").is_ok());
        assert_eq!(
            compiler.compile("<div>hi").err(),
            Some(RuntimeError::Template {
                tag: "div".to_string()
            })
        );
    }
}
