//! CSS selectors for the DCFS console (Quasar components)

/// Text inputs with a placeholder: login, registration, volume/disk forms
pub const INPUT: &str = ".q-field__native.q-placeholder";

/// Clickable wrapper of every form field, selects included
pub const FORM_FIELD: &str = ".q-field__inner.relative-position.col.self-stretch";

/// Volume picker above the file browser
pub const VOLUME_PICKER: &str = ".q-field__native.row.items-center";

/// Submit / confirm buttons
pub const PRIMARY_BUTTON: &str = ".q-btn.q-btn-item.non-selectable.no-outline.q-btn--standard.q-btn--rectangle.bg-primary.text-white.q-btn--actionable.q-focusable.q-hoverable";

/// Create buttons. Index 0 opens a form, index 1 submits it.
pub const POSITIVE_BUTTON: &str = ".q-btn.q-btn-item.non-selectable.no-outline.q-btn--standard.q-btn--rectangle.bg-positive.text-white.q-btn--actionable.q-focusable.q-hoverable";

/// Delete buttons on volume and disk cards
pub const DELETE_BUTTON: &str = ".q-btn.q-btn-item.non-selectable.no-outline.q-btn--standard.q-btn--rectangle.bg-negative.text-white.q-btn--actionable.q-focusable.q-hoverable.q-ma-sm";

/// Drawer navigation entries and context-menu entries
pub const MENU_ITEM: &str = ".q-item.q-item-type.row.no-wrap.q-item--dark.q-item--clickable.q-link.cursor-pointer.q-focusable.q-hoverable";

/// Entries of an opened select dropdown
pub const DROPDOWN_OPTION: &str = ".q-item.q-item-type.row.no-wrap.q-item--dark.q-item--clickable.q-link.cursor-pointer.q-manual-focusable";

/// Card titles on the volumes and disks pages, aligned with [`DELETE_BUTTON`]
pub const CARD_TITLE: &str = ".q-card__section.q-card__section--vert.col-auto";

pub const AVATAR: &str = ".q-avatar__content.row.flex-center.overflow-hidden";

pub const REGISTER_LINK: &str = ".underline-link";

/// Present once the dashboard rendered after login
pub const DASHBOARD: &str = ".flex.flex-center.items-center.q-pa-sm";

pub const FILE_BLOCK: &str = ".q-ma-sm.q-pa-md.flex.column.justify-center.items-center.file-block.text-center.full-height.relative-position";

/// Transfer progress card; shown for uploads and downloads alike
pub const TRANSFER_PROGRESS: &str = ".q-card.q-card--dark.q-dark.fixed-bottom-right.upload-progress";

pub const FILE_INPUT_ID: &str = "fileInput";

// Drawer positions
pub const NAV_VOLUMES: isize = 2;
pub const NAV_DISKS: isize = 3;

// Volume form field positions
pub const VOLUME_FIELD_BACKUP: isize = 1;
pub const VOLUME_FIELD_ENCRYPTION: isize = 2;
pub const VOLUME_FIELD_PARTITIONER: isize = 3;

// Disk form field positions
pub const DISK_FIELD_VOLUME: isize = 1;
pub const DISK_FIELD_PROVIDER: isize = 3;

pub const TEXT_APP_TITLE: &str = "Distributed Cloud File System";
pub const TEXT_LOGGED_OUT: &str = "Log in";
pub const TEXT_DOWNLOAD: &str = "Download";
pub const TEXT_DELETE: &str = "Delete";
