//! Depth-first walks over a part tree.
//!
//! A parent is visited before its children and children in order. Walks stay
//! inside one message: the body of a `message/rfc822` part is not entered.

use crate::model::attachment::Attachment;
use crate::model::part::MessagePart;
use crate::parser::header::strip_angle_brackets;

/// First part matching `predicate`. Stops at the first match.
pub fn find_first<'a, F>(part: &'a MessagePart, predicate: &mut F) -> Option<&'a MessagePart>
where
    F: FnMut(&MessagePart) -> bool,
{
    if predicate(part) {
        return Some(part);
    }
    part.children()
        .iter()
        .find_map(|child| find_first(child, predicate))
}

/// Call `visit` on every part.
pub fn visit_all<'a, F>(part: &'a MessagePart, visit: &mut F)
where
    F: FnMut(&'a MessagePart),
{
    visit(part);
    for child in part.children() {
        visit_all(child, visit);
    }
}

/// First part whose effective media type equals `media_type`. The query is
/// lowercased; a part without Content-Type counts as `text/plain`.
pub fn find_first_part_by_media_type<'a>(
    part: &'a MessagePart,
    media_type: &str,
) -> Option<&'a MessagePart> {
    let wanted = media_type.to_ascii_lowercase();
    find_first(part, &mut |p| p.media_type() == wanted)
}

/// Every part without children, in order.
pub fn find_all_leaf_parts(part: &MessagePart) -> Vec<&MessagePart> {
    let mut leaves = Vec::new();
    visit_all(part, &mut |p| {
        if !p.is_multipart() {
            leaves.push(p);
        }
    });
    leaves
}

/// The part with the given Content-ID; angle brackets on the query are
/// ignored.
pub fn find_part_by_content_id<'a>(
    part: &'a MessagePart,
    content_id: &str,
) -> Option<&'a MessagePart> {
    let wanted = strip_angle_brackets(content_id);
    find_first(part, &mut |p| p.content_id() == Some(wanted.as_str()))
}

/// Same as [`MessagePart::attachments`].
pub fn find_all_attachments(part: &MessagePart) -> Vec<Attachment> {
    find_all_leaf_parts(part)
        .into_iter()
        .map(Attachment::from_part)
        .filter(|a| !a.is_not_attachment())
        .collect()
}
