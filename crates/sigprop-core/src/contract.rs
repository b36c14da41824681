//! Contract clause re-indexing
//!
//! A contract is a `;`-separated list of clauses `c1, c2 -> result`, one
//! constraint per parameter. Clauses are rewritten to follow the new
//! parameter order: new parameters get `_`, and a removed parameter with a
//! real constraint makes the contract unconvertible.

use sigprop_delta::SignatureDelta;

/// Rewrite contract `text` for the new parameter list
///
/// # Errors
/// Returns the reason when a clause does not fit the old parameter count or
/// constrains a removed parameter.
pub(crate) fn reindex_contract(text: &str, delta: &SignatureDelta) -> Result<String, String> {
    let old_count = delta.old_parameter_count();
    let mut clauses = Vec::new();

    for clause in text.split(';').map(str::trim).filter(|c| !c.is_empty()) {
        let (args, result) = clause
            .split_once("->")
            .ok_or_else(|| format!("clause '{clause}' has no '->'"))?;
        let args: Vec<&str> = match args.trim() {
            "" => Vec::new(),
            list => list.split(',').map(str::trim).collect(),
        };
        if args.len() != old_count {
            return Err(format!(
                "clause '{clause}' has {} constraints for {old_count} parameters",
                args.len()
            ));
        }
        for (i, removed) in delta.to_remove().iter().enumerate() {
            match args.get(i) {
                Some(arg) if *removed && *arg != "_" => {
                    return Err(format!(
                        "constraint '{arg}' on removed parameter '{}'",
                        delta.old_parameter_name(i).unwrap_or_default()
                    ));
                }
                _ => {}
            }
        }
        let new_args = delta
            .parameters()
            .iter()
            .map(|p| match p.old_index() {
                None => Ok("_"),
                Some(i) => args
                    .get(i)
                    .copied()
                    .ok_or_else(|| format!("parameter '{}' maps to missing old position {i}", p.name())),
            })
            .collect::<Result<Vec<&str>, String>>()?;
        clauses.push(format!("{} -> {}", new_args.join(", "), result.trim()));
    }
    Ok(clauses.join("; "))
}
