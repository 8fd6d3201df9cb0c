//! XSL stylesheets for feature info transforms.
//!
//! The input stylesheets turn one backend response into a `<baz>` container
//! holding a single `<foo>` item; the output stylesheets render a merged
//! container of `<foo>` items as XML or HTML.

use std::fs;
use std::io;
use std::path::Path;

use tempfile::TempDir;

/// Input transform for XML responses like `<a><b>Bar</b></a>`.
pub const XSL_INPUT: &str = r#"<xsl:stylesheet version="1.0"
 xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
 <xsl:template match="/">
   <baz>
     <foo><xsl:value-of select="/a/b/text()" /></foo>
   </baz>
 </xsl:template>
</xsl:stylesheet>"#;

/// Input transform for HTML responses. Tag soup like `<h1>Hello<p>Bar3`
/// nests the paragraph inside the heading, hence the descendant step.
pub const XSL_INPUT_HTML: &str = r#"<xsl:stylesheet version="1.0"
 xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
 <xsl:template match="/">
   <baz>
     <foo><xsl:value-of select="/html/body//p" /></foo>
   </baz>
 </xsl:template>
</xsl:stylesheet>"#;

/// Output transform rendering items as `<bars><bar>..</bar></bars>`.
pub const XSL_OUTPUT: &str = r#"<xsl:stylesheet version="1.0"
 xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
 <xsl:template match="/">
    <bars>
      <xsl:apply-templates/>
    </bars>
 </xsl:template>

 <xsl:template match="foo">
     <bar><xsl:value-of select="text()" /></bar>
 </xsl:template>
</xsl:stylesheet>"#;

/// Output transform rendering items as paragraphs of an HTML page.
pub const XSL_OUTPUT_HTML: &str = r#"<xsl:stylesheet version="1.0"
 xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
 <xsl:template match="/">
    <html>
      <body>
        <h1>Bars</h1>
        <xsl:apply-templates/>
      </body>
    </html>
 </xsl:template>

 <xsl:template match="foo">
     <p><xsl:value-of select="text()" /></p>
 </xsl:template>
</xsl:stylesheet>"#;

/// File names the stylesheets are written under, as referenced by test
/// configurations.
pub const STYLESHEET_FILES: [(&str, &str); 4] = [
    ("fi_in.xsl", XSL_INPUT),
    ("fi_in_html.xsl", XSL_INPUT_HTML),
    ("fi_out.xsl", XSL_OUTPUT),
    ("fi_out_html.xsl", XSL_OUTPUT_HTML),
];

/// Write all stylesheets into `dir`.
pub fn write_stylesheets(dir: &Path) -> io::Result<()> {
    for (name, content) in STYLESHEET_FILES {
        fs::write(dir.join(name), content)?;
    }
    Ok(())
}

/// A temporary directory holding all stylesheets.
pub fn stylesheet_dir() -> io::Result<TempDir> {
    let dir = tempfile::tempdir()?;
    write_stylesheets(dir.path())?;
    Ok(dir)
}
