//! Import policies: how class and static references are written out.
//!
//! The inliner never decides naming strategy itself; it asks the policy
//! for a reference expression, and the policy may register a pending
//! import as a side effect, observable through the inliner's
//! `imports_to_add` sets.

use tailor_syntax::ast::{Expr, ExprKind, Ident, Resolution};
use tailor_syntax::span::Span;
use tailor_types::Ty;

use crate::error::CouldNotResolveImport;
use crate::inline::Inliner;

/// Policy specifying when and how to import classes when inlining
/// references.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImportPolicy {
    /// Import the outermost class and qualify references below it.
    ImportTopLevel,
    /// Import the named class directly and refer to it by simple name.
    ImportClassDirectly,
    /// Static-import members; classes import as in `ImportTopLevel`.
    StaticImportAlways,
}

impl ImportPolicy {
    /// A reference expression for a class, registering an import if the
    /// policy calls for one.
    pub fn class_reference(
        self,
        inliner: &mut Inliner<'_>,
        top_level: &str,
        fq: &str,
    ) -> Result<Expr, CouldNotResolveImport> {
        match self {
            ImportPolicy::ImportTopLevel | ImportPolicy::StaticImportAlways => {
                import_top_level(inliner, top_level, fq)
            }
            ImportPolicy::ImportClassDirectly => {
                inliner.resolve_class(fq)?;
                inliner.add_import(fq);
                Ok(class_expr(simple_name(fq), fq))
            }
        }
    }

    /// A reference expression for a static member of a class.
    pub fn static_reference(
        self,
        inliner: &mut Inliner<'_>,
        top_level: &str,
        fq: &str,
        member: &str,
    ) -> Result<Expr, CouldNotResolveImport> {
        match self {
            ImportPolicy::StaticImportAlways => {
                inliner.resolve_class(fq)?;
                inliner.add_static_import(format!("{fq}.{member}"));
                Ok(Expr::new(
                    ExprKind::Ident(Ident {
                        name: member.to_owned(),
                        res: Resolution::StaticMember { class: fq.to_owned(), member: member.to_owned() },
                    }),
                    Span::DUMMY,
                ))
            }
            _ => {
                let class = self.class_reference(inliner, top_level, fq)?;
                Ok(Expr::new(
                    ExprKind::Select { base: Box::new(class), name: member.to_owned() },
                    Span::DUMMY,
                ))
            }
        }
    }
}

/// The `ImportTopLevel` strategy:
/// - if the class is already imported, use its simple name;
/// - if its top-level class is imported, qualify from the top level;
/// - if another import's simple name conflicts, fully qualify;
/// - otherwise import the top-level class and qualify from it.
fn import_top_level(
    inliner: &mut Inliner<'_>,
    top_level: &str,
    fq: &str,
) -> Result<Expr, CouldNotResolveImport> {
    assert!(
        !top_level.is_empty() && !fq.is_empty(),
        "class references need both a top-level and a fully qualified name"
    );
    inliner.resolve_class(fq)?;
    let top_simple = simple_name(top_level);
    let top_segments = top_level.split('.').count();
    let qualified: Vec<&str> = fq.split('.').collect();

    let mut top_level_imported = false;
    let mut conflict = false;
    for import in inliner.all_imports() {
        if import == fq {
            return Ok(class_expr(simple_name(fq), fq));
        }
        top_level_imported |= import == top_level;
        if !top_level_imported {
            conflict |= simple_name(&import) == top_simple;
        }
    }
    if top_level_imported {
        return Ok(class_expr(&qualified[top_segments - 1..].join("."), fq));
    }
    if conflict {
        return Ok(class_expr(fq, fq));
    }
    inliner.add_import(top_level);
    Ok(class_expr(&qualified[top_segments - 1..].join("."), fq))
}

fn simple_name(fq: &str) -> &str {
    fq.rsplit('.').next().unwrap_or(fq)
}

/// The top-level class prefix of a (possibly nested) qualified class
/// name: everything up to and including the first capitalized segment.
pub(crate) fn top_level_class(fq: &str) -> &str {
    let mut end = 0;
    for segment in fq.split('.') {
        let segment_end = end + segment.len();
        if segment.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            return &fq[..segment_end];
        }
        end = segment_end + 1;
    }
    fq
}

fn class_expr(written: &str, fq: &str) -> Expr {
    Expr::typed(
        ExprKind::Ident(Ident { name: written.to_owned(), res: Resolution::Class(fq.to_owned()) }),
        Ty::class(fq),
        Span::DUMMY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::Bindings;
    use crate::unify::Env;
    use tailor_syntax::render;
    use tailor_types::Types;

    fn types() -> Types {
        let mut types = Types::with_defaults();
        types.add_class("com.google.common.collect.ImmutableList", &["E"], vec![]);
        types
    }

    #[test]
    fn already_imported_class_uses_simple_name() {
        let types = types();
        let imports = vec!["com.google.common.collect.ImmutableList".to_owned()];
        let env = Env::new(&types).with_imports(&imports);
        let mut inliner = Inliner::new(env, Bindings::new());
        let expr = ImportPolicy::ImportTopLevel
            .class_reference(
                &mut inliner,
                "com.google.common.collect.ImmutableList",
                "com.google.common.collect.ImmutableList",
            )
            .unwrap();
        assert_eq!(render::expr(&expr), "ImmutableList");
        assert!(inliner.imports_to_add().is_empty());
    }

    #[test]
    fn unimported_class_registers_an_import() {
        let types = types();
        let env = Env::new(&types);
        let mut inliner = Inliner::new(env, Bindings::new());
        let expr = ImportPolicy::ImportTopLevel
            .class_reference(
                &mut inliner,
                "com.google.common.collect.ImmutableList",
                "com.google.common.collect.ImmutableList",
            )
            .unwrap();
        assert_eq!(render::expr(&expr), "ImmutableList");
        assert_eq!(
            inliner.imports_to_add(),
            vec!["com.google.common.collect.ImmutableList".to_owned()]
        );
    }

    #[test]
    fn conflicting_simple_name_stays_fully_qualified() {
        let mut types = types();
        types.add_class("com.example.ImmutableList", &[], vec![]);
        let imports = vec!["com.example.ImmutableList".to_owned()];
        let env = Env::new(&types).with_imports(&imports);
        let mut inliner = Inliner::new(env, Bindings::new());
        let expr = ImportPolicy::ImportTopLevel
            .class_reference(
                &mut inliner,
                "com.google.common.collect.ImmutableList",
                "com.google.common.collect.ImmutableList",
            )
            .unwrap();
        assert_eq!(render::expr(&expr), "com.google.common.collect.ImmutableList");
    }

    #[test]
    fn static_import_always_registers_member() {
        let types = types();
        let env = Env::new(&types).with_policy(ImportPolicy::StaticImportAlways);
        let mut inliner = Inliner::new(env, Bindings::new());
        let expr = ImportPolicy::StaticImportAlways
            .static_reference(
                &mut inliner,
                "com.google.common.collect.ImmutableList",
                "com.google.common.collect.ImmutableList",
                "of",
            )
            .unwrap();
        assert_eq!(render::expr(&expr), "of");
        assert_eq!(
            inliner.static_imports_to_add(),
            vec!["com.google.common.collect.ImmutableList.of".to_owned()]
        );
    }

    #[test]
    fn unknown_class_is_an_import_error() {
        let types = types();
        let env = Env::new(&types);
        let mut inliner = Inliner::new(env, Bindings::new());
        let err = ImportPolicy::ImportTopLevel
            .class_reference(&mut inliner, "org.missing.Widget", "org.missing.Widget")
            .unwrap_err();
        assert_eq!(err, CouldNotResolveImport::new("org.missing.Widget"));
    }
}
