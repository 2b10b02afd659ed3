//! Responsive grid generator
//!
//! Turns [`GridSettings`] into either a Sass partial of mixins
//! (`wrapper`, `row-flex`, `col`, `size`, `shift` and per-breakpoint
//! variants) or a stylesheet of ready-made classes. The file is only
//! rewritten when its content changes, so the watcher does not see a
//! spurious style change on every start.

use crate::config::{parse_length, GridFormat, GridSettings, Length};
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::Context;
use crate::tasks::files;
use std::fmt::Write;
use std::fs;
use std::path::PathBuf;

/// File name of the generated partial, without extension
pub const GRID_FILE_STEM: &str = "smart-grid";

/// A breakpoint with its lengths resolved
#[derive(Debug, Clone)]
struct Screen {
    name: String,
    width: Length,
    fields: Option<Length>,
    offset: Option<Length>,
}

/// Grid settings with every length parsed
#[derive(Debug, Clone)]
struct Layout {
    columns: u32,
    atom: Length,
    offset: Length,
    max_width: Length,
    fields: Length,
    mobile_first: bool,
    screens: Vec<Screen>,
}

impl Layout {
    fn resolve(settings: &GridSettings) -> ExecutionResult<Self> {
        let length = |field: &str, value: &str| {
            parse_length(field, value).map_err(|e| ExecutionError::Grid(e.to_string()))
        };

        let mut screens = Vec::with_capacity(settings.breakpoints.len());
        for (name, breakpoint) in &settings.breakpoints {
            screens.push(Screen {
                name: name.clone(),
                width: length(name, &breakpoint.width)?,
                fields: breakpoint
                    .fields
                    .as_deref()
                    .map(|v| length(name, v))
                    .transpose()?,
                offset: breakpoint
                    .offset
                    .as_deref()
                    .map(|v| length(name, v))
                    .transpose()?,
            });
        }

        // desktop-first queries cascade from the widest screen down,
        // mobile-first ones from the narrowest up
        screens.sort_by(|a, b| a.width.value.total_cmp(&b.width.value));
        if !settings.mobile_first {
            screens.reverse();
        }

        Ok(Layout {
            columns: settings.columns,
            atom: Length {
                value: 100.0 / f64::from(settings.columns.max(1)),
                unit: "%".to_string(),
            },
            offset: length("offset", &settings.offset)?,
            max_width: length("container.maxWidth", &settings.container.max_width)?,
            fields: length("container.fields", &settings.container.fields)?,
            mobile_first: settings.mobile_first,
            screens,
        })
    }

    fn media(&self, screen: &Screen) -> String {
        let feature = if self.mobile_first { "min-width" } else { "max-width" };
        format!("@media screen and ({}: {})", feature, screen.width)
    }

    fn gutter<'a>(&'a self, screen: &'a Screen) -> &'a Length {
        screen.offset.as_ref().unwrap_or(&self.offset)
    }
}

/// Render the partial for `settings`
pub fn render(settings: &GridSettings) -> ExecutionResult<String> {
    let layout = Layout::resolve(settings)?;
    let rendered = match settings.format {
        GridFormat::Scss => render_scss(&layout),
        GridFormat::Css => render_css(&layout),
    };
    rendered.map_err(|e| ExecutionError::Grid(e.to_string()))
}

/// Write the partial into the configured output directory
///
/// Returns the path when the file was (re)written.
pub fn generate(ctx: &Context) -> ExecutionResult<Option<PathBuf>> {
    let settings = &ctx.config.grid;
    let extension = match settings.format {
        GridFormat::Scss => "scss",
        GridFormat::Css => "css",
    };
    let target = ctx
        .resolve(&settings.output)
        .join(format!("{}.{}", GRID_FILE_STEM, extension));

    let content = render(settings)?;
    if fs::read_to_string(&target).is_ok_and(|existing| existing == content) {
        ctx.print_debug(&format!("{} is up to date", target.display()));
        return Ok(None);
    }

    files::write_file(&target, &content)?;
    Ok(Some(target))
}

fn render_scss(layout: &Layout) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let half = layout.offset.scaled(0.5);

    writeln!(out, "$columns: {};", layout.columns)?;
    writeln!(out, "$atom: {};", layout.atom)?;
    writeln!(out, "$offset: {};", layout.offset)?;
    writeln!(out, "$offset-half: {};", half)?;
    writeln!(out, "$offset-half-neg: {};", half.scaled(-1.0))?;
    writeln!(out, "$container: {};", layout.max_width)?;
    writeln!(out, "$fields: {};", layout.fields)?;
    for screen in &layout.screens {
        writeln!(out, "$break-{}: {};", screen.name, screen.width)?;
    }
    out.push('\n');

    for screen in &layout.screens {
        writeln!(out, "@mixin {}-block() {{", screen.name)?;
        writeln!(out, "  {} {{", layout.media(screen))?;
        writeln!(out, "    @content;")?;
        writeln!(out, "  }}")?;
        writeln!(out, "}}\n")?;
    }

    writeln!(out, "@mixin wrapper-full() {{")?;
    writeln!(out, "  padding-left: $fields;")?;
    writeln!(out, "  padding-right: $fields;")?;
    for screen in &layout.screens {
        if let Some(fields) = &screen.fields {
            writeln!(out, "  @include {}-block() {{", screen.name)?;
            writeln!(out, "    padding-left: {};", fields)?;
            writeln!(out, "    padding-right: {};", fields)?;
            writeln!(out, "  }}")?;
        }
    }
    writeln!(out, "}}\n")?;

    writeln!(out, "@mixin wrapper() {{")?;
    writeln!(out, "  max-width: $container;")?;
    writeln!(out, "  margin: 0 auto;")?;
    writeln!(out, "  @include wrapper-full();")?;
    writeln!(out, "}}\n")?;

    writeln!(out, "@mixin row-offsets() {{")?;
    writeln!(out, "  margin-left: $offset-half-neg;")?;
    writeln!(out, "  margin-right: $offset-half-neg;")?;
    for screen in &layout.screens {
        if let Some(offset) = &screen.offset {
            let neg = offset.scaled(-0.5);
            writeln!(out, "  @include {}-block() {{", screen.name)?;
            writeln!(out, "    margin-left: {};", neg)?;
            writeln!(out, "    margin-right: {};", neg)?;
            writeln!(out, "  }}")?;
        }
    }
    writeln!(out, "}}\n")?;

    writeln!(out, "@mixin row-flex() {{")?;
    writeln!(out, "  display: flex;")?;
    writeln!(out, "  flex-wrap: wrap;")?;
    writeln!(out, "  @include row-offsets();")?;
    writeln!(out, "}}\n")?;

    writeln!(out, "@mixin col-offsets($type) {{")?;
    writeln!(out, "  #{{$type}}-left: $offset-half;")?;
    writeln!(out, "  #{{$type}}-right: $offset-half;")?;
    for screen in &layout.screens {
        if let Some(offset) = &screen.offset {
            let half = offset.scaled(0.5);
            writeln!(out, "  @include {}-block() {{", screen.name)?;
            writeln!(out, "    #{{$type}}-left: {};", half)?;
            writeln!(out, "    #{{$type}}-right: {};", half)?;
            writeln!(out, "  }}")?;
        }
    }
    writeln!(out, "}}\n")?;

    writeln!(out, "@mixin col() {{")?;
    writeln!(out, "  box-sizing: border-box;")?;
    writeln!(out, "  word-wrap: break-word;")?;
    writeln!(out, "  @include col-offsets(margin);")?;
    writeln!(out, "}}\n")?;

    writeln!(out, "@mixin size($n) {{")?;
    writeln!(out, "  width: calc(#{{$atom}} * #{{$n}} - #{{$offset}});")?;
    writeln!(out, "}}\n")?;

    writeln!(out, "@mixin shift($n) {{")?;
    writeln!(out, "  margin-left: calc(#{{$atom}} * #{{$n}} + #{{$offset-half}});")?;
    writeln!(out, "}}\n")?;

    for screen in &layout.screens {
        let gutter = layout.gutter(screen);
        writeln!(out, "@mixin size-{}($n) {{", screen.name)?;
        writeln!(out, "  @include {}-block() {{", screen.name)?;
        writeln!(out, "    width: calc(#{{$atom}} * #{{$n}} - {});", gutter)?;
        writeln!(out, "  }}")?;
        writeln!(out, "}}\n")?;

        writeln!(out, "@mixin shift-{}($n) {{", screen.name)?;
        writeln!(out, "  @include {}-block() {{", screen.name)?;
        writeln!(
            out,
            "    margin-left: calc(#{{$atom}} * #{{$n}} + {});",
            gutter.scaled(0.5)
        )?;
        writeln!(out, "  }}")?;
        writeln!(out, "}}\n")?;
    }

    Ok(out.trim_end().to_string() + "\n")
}

fn render_css(layout: &Layout) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let half = layout.offset.scaled(0.5);

    writeln!(out, ".wrapper {{")?;
    writeln!(out, "  max-width: {};", layout.max_width)?;
    writeln!(out, "  margin: 0 auto;")?;
    writeln!(out, "  padding-left: {};", layout.fields)?;
    writeln!(out, "  padding-right: {};", layout.fields)?;
    writeln!(out, "}}\n")?;

    writeln!(out, ".row {{")?;
    writeln!(out, "  display: flex;")?;
    writeln!(out, "  flex-wrap: wrap;")?;
    writeln!(out, "  margin-left: {};", half.scaled(-1.0))?;
    writeln!(out, "  margin-right: {};", half.scaled(-1.0))?;
    writeln!(out, "}}\n")?;

    writeln!(out, ".col {{")?;
    writeln!(out, "  box-sizing: border-box;")?;
    writeln!(out, "  word-wrap: break-word;")?;
    writeln!(out, "  margin-left: {};", half)?;
    writeln!(out, "  margin-right: {};", half)?;
    writeln!(out, "}}\n")?;

    size_classes(&mut out, layout, "", &layout.offset, "")?;

    for screen in &layout.screens {
        writeln!(out, "{} {{", layout.media(screen))?;
        if let Some(fields) = &screen.fields {
            writeln!(
                out,
                "  .wrapper {{ padding-left: {0}; padding-right: {0}; }}",
                fields
            )?;
        }
        if let Some(offset) = &screen.offset {
            writeln!(
                out,
                "  .row {{ margin-left: {0}; margin-right: {0}; }}",
                offset.scaled(-0.5)
            )?;
            writeln!(
                out,
                "  .col {{ margin-left: {0}; margin-right: {0}; }}",
                offset.scaled(0.5)
            )?;
        }
        let suffix = format!("-{}", screen.name);
        size_classes(&mut out, layout, &suffix, layout.gutter(screen), "  ")?;
        writeln!(out, "}}\n")?;
    }

    Ok(out.trim_end().to_string() + "\n")
}

fn size_classes(
    out: &mut String,
    layout: &Layout,
    suffix: &str,
    gutter: &Length,
    indent: &str,
) -> std::fmt::Result {
    for n in 1..=layout.columns {
        let width = layout.atom.scaled(f64::from(n));
        writeln!(
            out,
            "{}.size{}-{} {{ width: calc({} - {}); }}",
            indent, suffix, n, width, gutter
        )?;
    }
    for n in 0..layout.columns {
        let width = layout.atom.scaled(f64::from(n));
        writeln!(
            out,
            "{}.shift{}-{} {{ margin-left: calc({} + {}); }}",
            indent,
            suffix,
            n,
            width,
            gutter.scaled(0.5)
        )?;
    }
    if indent.is_empty() {
        out.push('\n');
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Breakpoint, Config};
    use crate::runner::Verbosity;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("missing {:?}", needle))
    }

    #[test]
    fn test_scss_defaults() {
        let scss = render(&GridSettings::default()).unwrap();

        assert!(scss.contains("$columns: 12;"));
        assert!(scss.contains("$atom: 8.3333%;"));
        assert!(scss.contains("$offset-half: 15px;"));
        assert!(scss.contains("@mixin row-flex()"));
        assert!(scss.contains("@mixin size-md($n)"));
        assert!(scss.contains("@media screen and (max-width: 960px)"));
        // sm overrides the container fields
        assert!(scss.contains("padding-left: 15px;"));
    }

    #[test]
    fn test_desktop_first_orders_widest_first() {
        let scss = render(&GridSettings::default()).unwrap();
        assert!(position(&scss, "@mixin lg-block") < position(&scss, "@mixin md-block"));
        assert!(position(&scss, "@mixin sm-block") < position(&scss, "@mixin xs-block"));
    }

    #[test]
    fn test_mobile_first_uses_min_width_ascending() {
        let settings = GridSettings {
            mobile_first: true,
            ..GridSettings::default()
        };
        let scss = render(&settings).unwrap();
        assert!(scss.contains("(min-width: 560px)"));
        assert!(!scss.contains("max-width: 560px"));
        assert!(position(&scss, "@mixin xs-block") < position(&scss, "@mixin lg-block"));
    }

    #[test]
    fn test_css_classes() {
        let mut breakpoints = BTreeMap::new();
        breakpoints.insert(
            "md".to_string(),
            Breakpoint {
                offset: Some("10px".to_string()),
                ..Breakpoint::new("960px")
            },
        );
        let settings = GridSettings {
            format: GridFormat::Css,
            columns: 4,
            breakpoints,
            ..GridSettings::default()
        };

        let css = render(&settings).unwrap();
        assert!(css.contains(".size-4 { width: calc(100% - 30px); }"));
        assert!(css.contains(".shift-1 { margin-left: calc(25% + 15px); }"));
        assert!(css.contains("@media screen and (max-width: 960px) {"));
        assert!(css.contains("  .size-md-2 { width: calc(50% - 10px); }"));
        assert!(css.contains(".row { margin-left: -5px; margin-right: -5px; }"));
    }

    #[test]
    fn test_generate_writes_only_on_change() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::new(Config::default())
            .with_root(dir.path())
            .with_verbosity(Verbosity::Silent);

        let written = generate(&ctx).unwrap().expect("first run writes");
        assert!(written.ends_with("src/style/utils/smart-grid.scss"));
        assert!(generate(&ctx).unwrap().is_none());

        fs::write(&written, "stale").unwrap();
        assert!(generate(&ctx).unwrap().is_some());
    }
}
