use rust_embed::RustEmbed;

/// Client bundle compiled into the binary from `ui/build/`.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/ui/build/"]
pub struct Assets;
