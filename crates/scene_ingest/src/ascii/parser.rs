//! Statement parser that recovers nodes, attributes and connections from scene text.
//!
//! Only the handful of commands that carry graph data are understood:
//! `createNode`, `select -ne`, `setAttr`, `connectAttr`, `parent`, and the
//! header commands `requires`, `fileInfo` and `currentUnit`. Everything else is
//! skipped and reported; this is not a script interpreter.
use std::borrow::Cow;

use tracing::{debug, trace, warn};

use crate::ascii::tokenizer::tokenize;
use crate::events::{EventSink, ImportEvent, ImportEventKind, ImportSummary};
use crate::graph::value::parse_bool_keyword;
use crate::graph::{AttrRef, AttributeValue, SceneGraph};

/// Parses `text` into `scene`, returning the statement totals.
pub fn parse_scene_text(
    text: &str,
    scene: &mut SceneGraph,
    sink: &mut dyn EventSink,
) -> ImportSummary {
    let mut parser = StatementParser::new(scene);
    parser.feed(text, sink);
    parser.finish()
}

/// Incremental statement parser writing into a [`SceneGraph`].
pub struct StatementParser<'s> {
    scene: &'s mut SceneGraph,
    current: Option<String>,
    summary: ImportSummary,
}

impl<'s> StatementParser<'s> {
    pub fn new(scene: &'s mut SceneGraph) -> Self {
        Self {
            scene,
            current: None,
            summary: ImportSummary::default(),
        }
    }

    /// Node that relative `setAttr` paths currently apply to.
    pub fn current_node(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Tokenizes `text` and applies every statement in it.
    pub fn feed(&mut self, text: &str, sink: &mut dyn EventSink) {
        let text = strip_line_comments(text);
        let mut words: Vec<&str> = Vec::new();

        for token in tokenize(&text) {
            if token.is_semicolon() {
                if !words.is_empty() {
                    self.apply_statement(&words, sink);
                    words.clear();
                }
            } else {
                words.push(token.text);
            }
        }

        // Unterminated trailing statement.
        if !words.is_empty() {
            self.apply_statement(&words, sink);
        }
    }

    /// Applies one statement given as its words (command first, no semicolon).
    pub fn apply_statement(&mut self, words: &[&str], sink: &mut dyn EventSink) {
        let Some((&command, rest)) = words.split_first() else {
            return;
        };
        let args = Args::split(command, rest);

        let outcome = match command {
            "createNode" => self.create_node(&args),
            "select" => self.select(&args),
            "setAttr" => self.set_attr(&args),
            "connectAttr" => self.connect_attr(&args),
            "parent" => self.parent(&args),
            "requires" => self.requires(&args),
            "fileInfo" => self.file_info(&args),
            "currentUnit" => self.current_unit(&args),
            _ => Err("unsupported command".to_owned()),
        };

        match outcome {
            Ok(()) => self.summary.statements += 1,
            Err(reason) => {
                trace!("Skipping '{}' statement: {}.", command, reason);
                self.summary.skipped_statements += 1;
                if sink.wants(ImportEventKind::StatementSkipped) {
                    sink.send(ImportEvent::StatementSkipped {
                        command: command.to_owned(),
                        reason,
                    });
                }
            }
        }
    }

    /// Consumes the parser and returns its totals.
    pub fn finish(mut self) -> ImportSummary {
        self.summary.nodes = self.scene.len();
        debug!(
            "Parsed {} statements ({} skipped), {} attributes, {} connections.",
            self.summary.statements,
            self.summary.skipped_statements,
            self.summary.attributes,
            self.summary.connections
        );
        self.summary
    }

    fn create_node(&mut self, args: &Args<'_>) -> Result<(), String> {
        let node_type = args
            .positionals
            .first()
            .map(|t| unquote(t))
            .ok_or("missing node type")?;

        let name = match args.flag(&["-n", "-name"]) {
            Some(n) => normalize_node_name(&unquote(n)).to_owned(),
            None => self.generated_name(&node_type),
        };

        self.scene.add_or_update_node(&name, &node_type);
        if let Some(parent) = args.flag(&["-p", "-parent"]) {
            let parent = normalize_node_name(&unquote(parent)).to_owned();
            self.scene
                .set_parent(&name, Some(&parent))
                .map_err(|e| e.to_string())?;
        }
        self.current = Some(name);
        Ok(())
    }

    fn select(&mut self, args: &Args<'_>) -> Result<(), String> {
        let target = args.positionals.last().ok_or("nothing selected")?;
        let name = normalize_node_name(&unquote(target)).to_owned();
        self.scene.add_or_update_node(&name, "");
        self.current = Some(name);
        Ok(())
    }

    fn set_attr(&mut self, args: &Args<'_>) -> Result<(), String> {
        let (path, values) = args
            .positionals
            .split_first()
            .ok_or("missing attribute path")?;
        let path = unquote(path);

        let (node, attr) = if path.starts_with('.') {
            let node = self.current.clone().ok_or("relative path without a current node")?;
            (node, path.into_owned())
        } else if let Some((node, attr)) = path.split_once('.') {
            let node = normalize_node_name(node).to_owned();
            self.scene.add_or_update_node(&node, "");
            (node, attr.to_owned())
        } else {
            let node = self.current.clone().ok_or("bare path without a current node")?;
            (node, path.into_owned())
        };

        let Some(value) = parse_value(args.flag(&["-type", "-typ"]).map(|t| unquote(t)), values)
        else {
            // Size-only statements such as `setAttr -s 4 ".input3D"` carry no value.
            return Ok(());
        };

        for (path, value) in expand_element_range(&attr, value) {
            self.scene
                .set_attribute(&node, &path, value)
                .map_err(|e| e.to_string())?;
            self.summary.attributes += 1;
        }
        Ok(())
    }

    fn connect_attr(&mut self, args: &Args<'_>) -> Result<(), String> {
        let [src, dst, ..] = args.positionals.as_slice() else {
            return Err("expected source and destination".to_owned());
        };
        let src = endpoint(src);
        let dst = endpoint(dst);
        if !self.scene.contains(&src.node) || !self.scene.contains(&dst.node) {
            trace!("Recording dangling connection {} -> {}.", src, dst);
        }
        self.scene.add_connection(src, dst);
        self.summary.connections += 1;
        Ok(())
    }

    fn parent(&mut self, args: &Args<'_>) -> Result<(), String> {
        let world = args.has_flag(&["-w", "-world"]);
        let (children, parent) = if world {
            (args.positionals.as_slice(), None)
        } else {
            let (parent, children) = args
                .positionals
                .split_last()
                .ok_or("missing parent")?;
            (children, Some(normalize_node_name(&unquote(parent)).to_owned()))
        };
        if children.is_empty() {
            return Err("missing child".to_owned());
        }

        for child in children {
            let child = normalize_node_name(&unquote(child)).to_owned();
            self.scene
                .set_parent(&child, parent.as_deref())
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn requires(&mut self, args: &Args<'_>) -> Result<(), String> {
        let [plugin, version, ..] = args.positionals.as_slice() else {
            return Err("expected plugin and version".to_owned());
        };
        self.scene
            .push_metadata(format!("requires.{}", unquote(plugin)), unquote(version));
        Ok(())
    }

    fn file_info(&mut self, args: &Args<'_>) -> Result<(), String> {
        let [key, value, ..] = args.positionals.as_slice() else {
            return Err("expected key and value".to_owned());
        };
        self.scene
            .push_metadata(format!("fileInfo.{}", unquote(key)), unquote(value));
        Ok(())
    }

    fn current_unit(&mut self, args: &Args<'_>) -> Result<(), String> {
        let mut any = false;
        for (flags, key) in [
            (&["-l", "-linear"][..], "units.linear"),
            (&["-a", "-angle"][..], "units.angle"),
            (&["-t", "-time"][..], "units.time"),
        ] {
            if let Some(v) = args.flag(flags) {
                self.scene.push_metadata(key, unquote(v));
                any = true;
            }
        }
        if any {
            Ok(())
        } else {
            Err("no unit flags".to_owned())
        }
    }

    fn generated_name(&self, node_type: &str) -> String {
        (1..)
            .map(|i| format!("{node_type}{i}"))
            .find(|n| !self.scene.contains(n))
            .unwrap_or_else(|| node_type.to_owned())
    }
}

/// Flags and positional words of one statement.
struct Args<'a> {
    flags: Vec<(&'a str, Option<&'a str>)>,
    positionals: Vec<&'a str>,
}

impl<'a> Args<'a> {
    fn split(command: &str, words: &[&'a str]) -> Self {
        let mut flags = Vec::new();
        let mut positionals = Vec::new();
        let mut iter = words.iter().copied();

        while let Some(word) = iter.next() {
            if is_flag(word) {
                let value = if flag_takes_argument(command, word) {
                    iter.next()
                } else {
                    None
                };
                flags.push((word, value));
            } else {
                positionals.push(word);
            }
        }

        Self { flags, positionals }
    }

    /// Argument of the last occurrence of any of `names`.
    fn flag(&self, names: &[&str]) -> Option<&'a str> {
        self.flags
            .iter()
            .rev()
            .find(|(f, v)| v.is_some() && names.contains(f))
            .and_then(|(_, v)| *v)
    }

    fn has_flag(&self, names: &[&str]) -> bool {
        self.flags.iter().any(|(f, _)| names.contains(f))
    }
}

fn is_flag(word: &str) -> bool {
    let mut chars = word.chars();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn flag_takes_argument(command: &str, flag: &str) -> bool {
    match command {
        "createNode" => matches!(flag, "-n" | "-name" | "-p" | "-parent"),
        "setAttr" => matches!(
            flag,
            "-s" | "-size"
                | "-type"
                | "-typ"
                | "-k"
                | "-keyable"
                | "-l"
                | "-lock"
                | "-cb"
                | "-channelBox"
                | "-ca"
                | "-caching"
        ),
        "connectAttr" => matches!(flag, "-l" | "-lock"),
        "requires" => matches!(flag, "-nodeType" | "-dataType"),
        "currentUnit" => matches!(flag, "-l" | "-linear" | "-a" | "-angle" | "-t" | "-time"),
        _ => false,
    }
}

/// Drops whole-line `//` comments; the tokenizer has no notion of lines.
fn strip_line_comments(text: &str) -> Cow<'_, str> {
    if !text.contains("//") {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if !line.trim_start().starts_with("//") {
            out.push_str(line);
            out.push('\n');
        }
    }
    Cow::Owned(out)
}

/// Strips surrounding quotes (either side, since quoted text with spaces is split into several words).
fn unquote(word: &str) -> Cow<'_, str> {
    let inner = word.strip_prefix('"').unwrap_or(word);
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    if inner.contains("\\\"") {
        Cow::Owned(inner.replace("\\\"", "\""))
    } else {
        Cow::Borrowed(inner)
    }
}

/// Strips the root-namespace `:` and reduces DAG paths to their leaf name.
fn normalize_node_name(name: &str) -> &str {
    let name = name.rsplit('|').next().unwrap_or(name);
    name.strip_prefix(':').unwrap_or(name)
}

fn endpoint(word: &str) -> AttrRef {
    let mut r = AttrRef::parse(&unquote(word));
    r.node = normalize_node_name(&r.node).to_owned();
    r
}

fn parse_value(type_name: Option<Cow<'_, str>>, words: &[&str]) -> Option<AttributeValue> {
    if words.is_empty() {
        return None;
    }

    let Some(type_name) = type_name else {
        return Some(infer_value(words));
    };

    let value = match type_name.as_ref() {
        "string" => AttributeValue::String(join_unquoted(words)),
        "stringArray" => {
            let rest = skip_count(words);
            AttributeValue::String(join_unquoted(rest))
        }
        "double2" | "double3" | "double4" | "float2" | "float3" | "matrix" | "reflectanceRGB"
        | "spectrumRGB" => {
            parse_floats(words).map_or_else(|| opaque(words), AttributeValue::FloatArray)
        }
        "doubleArray" | "floatArray" | "pointArray" | "vectorArray" => {
            parse_floats(skip_count(words)).map_or_else(|| opaque(words), AttributeValue::FloatArray)
        }
        "long2" | "long3" | "short2" | "short3" => {
            parse_ints(words).map_or_else(|| opaque(words), AttributeValue::IntArray)
        }
        "Int32Array" => {
            parse_ints(skip_count(words)).map_or_else(|| opaque(words), AttributeValue::IntArray)
        }
        other => {
            trace!("Keeping '{}' payload opaque.", other);
            opaque(words)
        }
    };
    Some(value)
}

fn infer_value(words: &[&str]) -> AttributeValue {
    if let [word] = words {
        if word.starts_with('"') {
            return AttributeValue::String(unquote(word).into_owned());
        }
        if let Some(b) = parse_bool_word(word) {
            return AttributeValue::Bool(b);
        }
        if let Ok(i) = word.parse::<i64>() {
            return AttributeValue::Int(i);
        }
        if let Ok(f) = word.parse::<f64>() {
            return AttributeValue::Float(f);
        }
        return AttributeValue::String((*word).to_owned());
    }

    if let Some(ints) = parse_ints(words) {
        return AttributeValue::IntArray(ints);
    }
    if let Some(floats) = parse_floats(words) {
        return AttributeValue::FloatArray(floats);
    }
    AttributeValue::String(join_unquoted(words))
}

fn parse_bool_word(word: &str) -> Option<bool> {
    // Digits stay numeric here; only the keyword spellings are booleans.
    if word.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    parse_bool_keyword(word)
}

fn parse_floats(words: &[&str]) -> Option<Vec<f64>> {
    words.iter().map(|w| w.parse::<f64>().ok()).collect()
}

fn parse_ints(words: &[&str]) -> Option<Vec<i64>> {
    words.iter().map(|w| w.parse::<i64>().ok()).collect()
}

fn skip_count<'a, 'b>(words: &'a [&'b str]) -> &'a [&'b str] {
    match words.split_first() {
        Some((first, rest)) if first.parse::<usize>().is_ok() => rest,
        _ => words,
    }
}

fn join_unquoted(words: &[&str]) -> String {
    let joined = words.join(" ");
    unquote(&joined).into_owned()
}

fn opaque(words: &[&str]) -> AttributeValue {
    AttributeValue::Opaque(words.join(" ").into_bytes())
}

/// Splits a value written to an element range such as `input3D[0:2]` into one value per element.
fn expand_element_range(attr: &str, value: AttributeValue) -> Vec<(String, AttributeValue)> {
    let Some((prefix, lo, hi, suffix)) = parse_element_range(attr) else {
        return vec![(attr.to_owned(), value)];
    };
    let Some(count) = (hi - lo).checked_add(1) else {
        warn!("Element range in '{}' is too large; keeping it whole.", attr);
        return vec![(attr.to_owned(), value)];
    };
    if count == 1 {
        return vec![(format!("{prefix}[{lo}]{suffix}"), value)];
    }

    let split = |len: usize| (count > 1 && len % count == 0).then_some(len / count);
    let per_element: Option<Vec<AttributeValue>> = match &value {
        AttributeValue::FloatArray(a) => split(a.len()).map(|per| {
            a.chunks(per)
                .map(|c| match c {
                    [v] => AttributeValue::Float(*v),
                    _ => AttributeValue::FloatArray(c.to_vec()),
                })
                .collect()
        }),
        AttributeValue::IntArray(a) => split(a.len()).map(|per| {
            a.chunks(per)
                .map(|c| match c {
                    [v] => AttributeValue::Int(*v),
                    _ => AttributeValue::IntArray(c.to_vec()),
                })
                .collect()
        }),
        _ => None,
    };

    match per_element {
        Some(values) => values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (format!("{prefix}[{}]{suffix}", lo + i), v))
            .collect(),
        None => {
            if count > 1 {
                warn!(
                    "Value for '{}' does not divide across {} elements; keeping it whole.",
                    attr, count
                );
            }
            vec![(attr.to_owned(), value)]
        }
    }
}

fn parse_element_range(attr: &str) -> Option<(&str, usize, usize, &str)> {
    let open = attr.find('[')?;
    let close = open + attr[open..].find(']')?;
    let (lo, hi) = attr[open + 1..close].split_once(':')?;
    let lo: usize = lo.parse().ok()?;
    let hi: usize = hi.parse().ok()?;
    (hi >= lo).then_some((&attr[..open], lo, hi, &attr[close + 1..]))
}
