mod format_tests;
mod mask_tests;
