/// Treat a zero-length payload the same as an absent one.
pub(crate) fn non_empty(payload: Option<&[u8]>) -> Option<&[u8]> {
    payload.filter(|bytes| !bytes.is_empty())
}
