use anyhow::Context;
use camino::Utf8PathBuf;

use super::{PatchStep, StepAction, StepContext};

/// Resolved by Xcode at build time to `<bundle id>.payments`.
pub const PAYMENTS_SCHEME: &str = "${PRODUCT_BUNDLE_IDENTIFIER}.payments";

/// Register the payments URL scheme in the app's `Info.plist`.
///
/// The scheme string must appear at most once across all `CFBundleURLTypes`
/// entries. A missing or malformed Info.plist fails the run: the payment
/// provider's callback cannot reach an app without the scheme.
pub struct RegisterUrlScheme;

impl PatchStep for RegisterUrlScheme {
    fn id(&self) -> &'static str {
        "register_url_scheme"
    }

    fn title(&self) -> &'static str {
        "Register payments URL scheme"
    }

    fn apply(&self, cx: &mut StepContext<'_>) -> anyhow::Result<StepAction> {
        let rel = Utf8PathBuf::from("platforms/ios")
            .join(cx.project_name)
            .join(format!("{}-Info.plist", cx.project_name));

        let contents = cx
            .read_file(&rel)
            .with_context(|| format!("read {rel}"))?;
        let mut root = plist::Value::from_reader_xml(contents.as_bytes())
            .with_context(|| format!("parse {rel}"))?;
        let dict = root
            .as_dictionary_mut()
            .with_context(|| format!("{rel}: root is not a dictionary"))?;

        if !dict.contains_key("CFBundleURLTypes") {
            dict.insert("CFBundleURLTypes".to_string(), plist::Value::Array(vec![]));
        }
        let url_types = dict
            .get_mut("CFBundleURLTypes")
            .and_then(|v| v.as_array_mut())
            .with_context(|| format!("{rel}: CFBundleURLTypes is not an array"))?;

        let registered = url_types.iter().any(|entry| {
            entry
                .as_dictionary()
                .and_then(|d| d.get("CFBundleURLSchemes"))
                .and_then(|v| v.as_array())
                .is_some_and(|schemes| {
                    schemes.iter().any(|s| s.as_string() == Some(PAYMENTS_SCHEME))
                })
        });
        if registered {
            return Ok(StepAction::Skipped {
                message: format!("URL scheme {PAYMENTS_SCHEME} already registered"),
            });
        }

        let mut entry = plist::Dictionary::new();
        entry.insert(
            "CFBundleTypeRole".to_string(),
            plist::Value::String("Editor".to_string()),
        );
        entry.insert(
            "CFBundleURLSchemes".to_string(),
            plist::Value::Array(vec![plist::Value::String(PAYMENTS_SCHEME.to_string())]),
        );
        url_types.push(plist::Value::Dictionary(entry));

        let mut buf = Vec::new();
        root.to_writer_xml(&mut buf)
            .with_context(|| format!("serialize {rel}"))?;
        let serialized = String::from_utf8(buf).context("serialized plist is not UTF-8")?;
        cx.stage_file(rel, serialized);

        Ok(StepAction::Applied {
            message: Some(format!("registered URL scheme {PAYMENTS_SCHEME}")),
        })
    }
}
