//! CommonJS script bundling.
//!
//! Starting from an entry's sources, follows `require("…")` calls through
//! the module resolver and lays every reachable module out in a numbered
//! table:
//!
//! ```text
//! (function (modules, entries) { …runtime… })([
//!   /* 0: www/javascripts/site.js */   function (module, exports, __vapid_require__) { … },
//!   /* 1: node_modules/lib/index.js */ function (module, exports, __vapid_require__) { … },
//!   /* 2: www/stylesheets/site.scss */ function () { /* extracted */ },
//! ], [0]);
//! ```
//!
//! Ids follow discovery order (breadth-first), so the output is a pure
//! function of the sources. Files matched by a transform rule become empty
//! stubs; their content is handled by the style pipeline.
//!
//! Requires are found on the parsed AST: only real `require("literal")`
//! calls count, never text inside comments or strings.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use oxc::allocator::Allocator;
use oxc::ast::ast::{Argument, CallExpression};
use oxc::ast_visit::{Visit, walk};
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::{SourceType, Span};
use rustc_hash::FxHashMap;

use crate::pipeline::{BuildPlan, ModuleResolver};

const REQUIRE_FN: &str = "__vapid_require__";

const RUNTIME_HEAD: &str = "(function (modules, entries) {
  var cache = {};
  function __vapid_require__(id) {
    var cached = cache[id];
    if (cached) return cached.exports;
    var module = (cache[id] = { exports: {} });
    modules[id].call(module.exports, module, module.exports, __vapid_require__);
    return module.exports;
  }
  entries.forEach(__vapid_require__);
})([
";

#[derive(Debug)]
enum ModuleBody {
    Script(String),
    Json(String),
    /// Handled by a transform rule; emitted as an empty stub.
    Extracted,
}

#[derive(Debug)]
struct Module {
    label: String,
    body: ModuleBody,
}

/// Module table of one entry.
#[derive(Debug)]
pub struct ScriptGraph {
    modules: Vec<Module>,
    entries: Vec<usize>,
    /// Extracted modules in discovery order.
    styles: Vec<PathBuf>,
}

impl ScriptGraph {
    /// Walk the require graph rooted at `sources`.
    pub fn collect(sources: &[PathBuf], plan: &BuildPlan) -> Result<Self> {
        let order = plan.context().module_search_order();
        let resolver = ModuleResolver::scripts(&order);

        let mut table = ModuleTable::default();
        let entries: Vec<usize> = sources.iter().map(|s| table.intern(s.clone())).collect();

        let mut bodies: FxHashMap<usize, ModuleBody> = FxHashMap::default();
        let mut styles = Vec::new();

        while let Some(id) = table.queue.pop_front() {
            let path = table.paths[id].clone();

            if plan.chain().rule_for(&path).is_some() {
                styles.push(path);
                bodies.insert(id, ModuleBody::Extracted);
                continue;
            }

            let source = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;

            if path.extension().is_some_and(|ext| ext == "json") {
                bodies.insert(id, ModuleBody::Json(source.trim().to_string()));
                continue;
            }

            let mut rewritten = String::with_capacity(source.len());
            let mut last = 0;
            for call in find_requires(&source, &path)? {
                let target = resolver.resolve(&call.specifier, &path).ok_or_else(|| {
                    anyhow!(
                        "Module not found: can't resolve '{}' in '{}'",
                        call.specifier,
                        path.parent().unwrap_or(Path::new("")).display()
                    )
                })?;
                let target_id = table.intern(target);

                rewritten.push_str(&source[last..call.span.start as usize]);
                write!(rewritten, "{REQUIRE_FN}({target_id})")?;
                last = call.span.end as usize;
            }
            rewritten.push_str(&source[last..]);
            bodies.insert(id, ModuleBody::Script(rewritten));
        }

        let modules = table
            .paths
            .iter()
            .enumerate()
            .map(|(id, path)| Module {
                label: label_for(path, plan),
                body: bodies.remove(&id).unwrap_or(ModuleBody::Extracted),
            })
            .collect();

        Ok(Self {
            modules,
            entries,
            styles,
        })
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Sources handled by the style pipeline.
    pub fn styles(&self) -> &[PathBuf] {
        &self.styles
    }

    /// Unminified bundle text.
    pub fn render(&self) -> Result<String> {
        let mut out = String::from(RUNTIME_HEAD);
        for (id, module) in self.modules.iter().enumerate() {
            writeln!(out, "/* {id}: {} */", module.label)?;
            match &module.body {
                ModuleBody::Script(src) => {
                    writeln!(out, "function (module, exports, {REQUIRE_FN}) {{\n{src}\n}},")?;
                }
                ModuleBody::Json(src) => {
                    writeln!(out, "function (module) {{\nmodule.exports = {src};\n}},")?;
                }
                ModuleBody::Extracted => out.push_str("function () {\n/* extracted */\n},\n"),
            }
        }
        let entries: Vec<String> = self.entries.iter().map(ToString::to_string).collect();
        writeln!(out, "], [{}]);", entries.join(", "))?;
        Ok(out)
    }
}

/// Path ↔ id assignment plus the pending work queue.
#[derive(Debug, Default)]
struct ModuleTable {
    ids: FxHashMap<PathBuf, usize>,
    paths: Vec<PathBuf>,
    queue: VecDeque<usize>,
}

impl ModuleTable {
    /// Id of `path`, assigning the next one (and queueing it) on first sight.
    fn intern(&mut self, path: PathBuf) -> usize {
        if let Some(&id) = self.ids.get(&path) {
            return id;
        }
        let id = self.paths.len();
        self.ids.insert(path.clone(), id);
        self.paths.push(path);
        self.queue.push_back(id);
        id
    }
}

/// One `require("…")` call: the span of the whole call and its specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequireCall {
    span: Span,
    specifier: String,
}

/// Collects `require` calls with a single string-literal argument.
#[derive(Debug, Default)]
struct RequireCollector {
    calls: Vec<RequireCall>,
}

impl<'a> Visit<'a> for RequireCollector {
    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if it.callee.is_specific_id("require")
            && it.arguments.len() == 1
            && let Some(Argument::StringLiteral(literal)) = it.arguments.first()
        {
            self.calls.push(RequireCall {
                span: it.span,
                specifier: literal.value.to_string(),
            });
            return;
        }
        walk::walk_call_expression(self, it);
    }
}

/// Parse one module and list its requires in source order.
fn find_requires(source: &str, path: &Path) -> Result<Vec<RequireCall>> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if let Some(error) = ret.errors.first() {
        bail!("{}: {error}", path.display());
    }

    let mut collector = RequireCollector::default();
    collector.visit_program(&ret.program);
    collector.calls.sort_by_key(|call| call.span.start);
    Ok(collector.calls)
}

/// Label relative to whichever root contains `path`.
pub(super) fn label_for(path: &Path, plan: &BuildPlan) -> String {
    let ctx = plan.context();
    [ctx.site_root(), ctx.framework_root()]
        .iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Generated script and its source map.
#[derive(Debug)]
pub struct EmittedScript {
    pub code: String,
    pub map: Option<String>,
}

/// Parse the bundle with oxc, minify when `minify` is set, and print it
/// with a source map whose source is named `map_source`.
pub fn emit(bundle: &str, map_source: &Path, minify: bool) -> Result<EmittedScript> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, bundle, SourceType::cjs()).parse();
    if let Some(error) = ret.errors.first() {
        bail!("{}: {error}", map_source.display());
    }
    let mut program = ret.program;

    let scoping = if minify {
        let options = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions::smallest()),
        };
        Minifier::new(options).minify(&allocator, &mut program).scoping
    } else {
        None
    };

    let mut options = CodegenOptions {
        source_map_path: Some(map_source.to_path_buf()),
        ..CodegenOptions::default()
    };
    if minify {
        options.minify = true;
        options.comments = CommentOptions::disabled();
    }

    let ret = Codegen::new()
        .with_options(options)
        .with_scoping(scoping)
        .build(&program);

    Ok(EmittedScript {
        code: ret.code,
        map: ret.map.map(|map| map.to_json_string()),
    })
}
