//! Genotype serialization: lossless text and binary round-trips plus the
//! human-readable renderings.
//!
//! The text form pushes every scalar through the token codec in a fixed
//! sequence — gene shape, gene values, Dc shape and values, constant shape
//! and values — and the parser mirrors that sequence exactly. Shape
//! mismatches are fatal, never silently repaired. The binary form writes the
//! same structure with fixed-width big-endian fields; its reader re-validates
//! shape and resizes the preallocated arrays only when shape differs.

use crate::codec::{self, Token};
use crate::error::{KarvaError, Result};
use crate::genome::Chromosome;
use crate::symbols::{SymbolKind, SymbolSet};

impl Chromosome {
    /// Serialize the genotype to the token text form.
    pub fn genotype_to_string(&self) -> String {
        let mut out = String::new();
        codec::encode_i32(&mut out, self.genes.len() as i32);
        codec::encode_i32(&mut out, self.gene_size() as i32);
        for gene in &self.genes {
            for &id in gene {
                codec::encode_i32(&mut out, id as i32);
            }
        }

        match &self.dc {
            Some(dc) => {
                codec::encode_i32(&mut out, dc.len() as i32);
                codec::encode_i32(&mut out, self.tail_size as i32);
                for gene_dc in dc {
                    for &slot in gene_dc {
                        codec::encode_i32(&mut out, slot as i32);
                    }
                }
            }
            None => {
                codec::encode_i32(&mut out, 0);
                codec::encode_i32(&mut out, 0);
            }
        }

        match &self.constants {
            Some(constants) => {
                codec::encode_i32(&mut out, constants.len() as i32);
                codec::encode_i32(&mut out, constants.first().map_or(0, Vec::len) as i32);
                for pool in constants {
                    for &value in pool {
                        codec::encode_f64(&mut out, value);
                    }
                }
            }
            None => {
                codec::encode_i32(&mut out, 0);
                codec::encode_i32(&mut out, 0);
            }
        }
        out
    }

    /// Parse a token text genotype into this chromosome, starting at
    /// `position`. Returns the position after the genotype. The incoming
    /// shape must match this chromosome's configured shape.
    pub fn parse_genotype(&mut self, text: &str, position: usize) -> Result<usize> {
        let mut cursor = position;

        let (num_genes, next) = expect_i32(text, cursor)?;
        cursor = next;
        let (gene_size, next) = expect_i32(text, cursor)?;
        cursor = next;
        if num_genes as usize != self.genes.len() || gene_size as usize != self.gene_size() {
            return Err(KarvaError::Genotype(format!(
                "genotype shape {num_genes}x{gene_size} does not match chromosome {}x{}",
                self.genes.len(),
                self.gene_size()
            )));
        }
        for gene in &mut self.genes {
            for slot in gene.iter_mut() {
                let (value, next) = expect_i32(text, cursor)?;
                cursor = next;
                *slot = non_negative(value)? as usize;
            }
        }

        let (dc_genes, next) = expect_i32(text, cursor)?;
        cursor = next;
        let (dc_len, next) = expect_i32(text, cursor)?;
        cursor = next;
        match &mut self.dc {
            Some(dc) => {
                if dc_genes as usize != dc.len() || dc_len as usize != self.tail_size {
                    return Err(KarvaError::Genotype(format!(
                        "Dc shape {dc_genes}x{dc_len} does not match chromosome {}x{}",
                        dc.len(),
                        self.tail_size
                    )));
                }
                for gene_dc in dc.iter_mut() {
                    for slot in gene_dc.iter_mut() {
                        let (value, next) = expect_i32(text, cursor)?;
                        cursor = next;
                        *slot = non_negative(value)? as usize;
                    }
                }
            }
            None if dc_genes != 0 || dc_len != 0 => {
                return Err(KarvaError::Genotype(format!(
                    "genotype carries a {dc_genes}x{dc_len} Dc array, chromosome has none"
                )));
            }
            None => {}
        }

        let (const_genes, next) = expect_i32(text, cursor)?;
        cursor = next;
        let (per_gene, next) = expect_i32(text, cursor)?;
        cursor = next;
        match &mut self.constants {
            Some(constants) => {
                let expected = constants.first().map_or(0, Vec::len);
                if const_genes as usize != constants.len() || per_gene as usize != expected {
                    return Err(KarvaError::Genotype(format!(
                        "constant shape {const_genes}x{per_gene} does not match chromosome {}x{expected}",
                        constants.len()
                    )));
                }
                for pool in constants.iter_mut() {
                    for slot in pool.iter_mut() {
                        let (value, next) = expect_f64(text, cursor)?;
                        cursor = next;
                        *slot = value;
                    }
                }
            }
            None if const_genes != 0 || per_gene != 0 => {
                return Err(KarvaError::Genotype(format!(
                    "genotype carries a {const_genes}x{per_gene} constant pool, chromosome has none"
                )));
            }
            None => {}
        }

        self.invalidate();
        Ok(cursor)
    }

    /// Append the binary genotype frame: big-endian u32 shape fields and
    /// values, f64 constants as raw bits.
    pub fn write_genotype(&self, out: &mut Vec<u8>) {
        write_u32(out, self.genes.len() as u32);
        write_u32(out, self.gene_size() as u32);
        for gene in &self.genes {
            for &id in gene {
                write_u32(out, id as u32);
            }
        }

        let (dc_genes, dc_len) = match &self.dc {
            Some(dc) => (dc.len() as u32, self.tail_size as u32),
            None => (0, 0),
        };
        write_u32(out, dc_genes);
        write_u32(out, dc_len);
        if let Some(dc) = &self.dc {
            for gene_dc in dc {
                for &slot in gene_dc {
                    write_u32(out, slot as u32);
                }
            }
        }

        let (const_genes, per_gene) = match &self.constants {
            Some(constants) => (
                constants.len() as u32,
                constants.first().map_or(0, Vec::len) as u32,
            ),
            None => (0, 0),
        };
        write_u32(out, const_genes);
        write_u32(out, per_gene);
        if let Some(constants) = &self.constants {
            for pool in constants {
                for &value in pool {
                    out.extend_from_slice(&value.to_bits().to_be_bytes());
                }
            }
        }
    }

    /// Read a binary genotype frame, returning the byte count consumed.
    ///
    /// The preallocated arrays are reused when the incoming shape matches
    /// and resized when it differs. A differing gene length can only be
    /// adopted when a Dc array is present to recover the head/tail split;
    /// otherwise it is fatal.
    pub fn read_genotype(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut cursor = 0usize;

        let num_genes = read_u32(bytes, &mut cursor)? as usize;
        let gene_size = read_u32(bytes, &mut cursor)? as usize;

        let dc_header = num_genes
            .checked_mul(gene_size)
            .and_then(|entries| entries.checked_mul(4))
            .and_then(|len| len.checked_add(cursor))
            .ok_or_else(|| {
                KarvaError::Genotype(format!(
                    "binary genotype shape {num_genes}x{gene_size} overflows"
                ))
            })?;
        if bytes.len() < dc_header {
            return Err(KarvaError::Genotype("truncated binary genotype".to_string()));
        }

        // Peek the Dc shape to decide whether a new gene length is adoptable.
        let mut peek = dc_header;
        let dc_genes = read_u32(bytes, &mut peek)? as usize;
        let dc_len = read_u32(bytes, &mut peek)? as usize;

        if gene_size != self.gene_size() {
            if self.dc.is_some() && dc_genes == num_genes && dc_len > 0 && dc_len < gene_size {
                self.tail_size = dc_len;
                self.head_size = gene_size - dc_len;
            } else {
                return Err(KarvaError::Genotype(format!(
                    "binary genotype gene length {gene_size} does not match configured {}",
                    self.gene_size()
                )));
            }
        }
        if self.genes.len() != num_genes || self.genes.first().map_or(0, Vec::len) != gene_size {
            self.genes = vec![vec![0usize; gene_size]; num_genes];
        }
        for gene in &mut self.genes {
            for slot in gene.iter_mut() {
                *slot = read_u32(bytes, &mut cursor)? as usize;
            }
        }

        // Re-read the Dc header for real and consume the values.
        let dc_genes = read_u32(bytes, &mut cursor)? as usize;
        let dc_len = read_u32(bytes, &mut cursor)? as usize;
        if dc_genes == 0 && dc_len == 0 {
            self.dc = None;
        } else {
            if dc_genes != num_genes {
                return Err(KarvaError::Genotype(format!(
                    "binary Dc section covers {dc_genes} genes, chromosome has {num_genes}"
                )));
            }
            if dc_len != self.tail_size {
                return Err(KarvaError::Genotype(format!(
                    "binary Dc length {dc_len} does not match tail size {}",
                    self.tail_size
                )));
            }
            let needs_resize = self.dc.as_ref().map_or(true, |dc| {
                dc.len() != dc_genes || dc.first().map_or(0, Vec::len) != dc_len
            });
            if needs_resize {
                self.dc = Some(vec![vec![0usize; dc_len]; dc_genes]);
            }
            for gene_dc in self.dc.as_mut().expect("allocated above") {
                for slot in gene_dc.iter_mut() {
                    *slot = read_u32(bytes, &mut cursor)? as usize;
                }
            }
        }

        let const_genes = read_u32(bytes, &mut cursor)? as usize;
        let per_gene = read_u32(bytes, &mut cursor)? as usize;
        if const_genes == 0 && per_gene == 0 {
            self.constants = None;
        } else {
            if const_genes != num_genes {
                return Err(KarvaError::Genotype(format!(
                    "binary constant section covers {const_genes} genes, chromosome has {num_genes}"
                )));
            }
            let needs_resize = self.constants.as_ref().map_or(true, |c| {
                c.len() != const_genes || c.first().map_or(0, Vec::len) != per_gene
            });
            if needs_resize {
                self.constants = Some(vec![vec![0.0f64; per_gene]; const_genes]);
            }
            for pool in self.constants.as_mut().expect("allocated above") {
                for slot in pool.iter_mut() {
                    *slot = f64::from_bits(read_u64(bytes, &mut cursor)?);
                }
            }
        }

        self.invalidate();
        Ok(cursor)
    }

    /// Human-readable Karva rendering: dot-joined symbol glyphs per gene,
    /// then the resolved constant values.
    ///
    /// Constant-terminals render as `C<index>` using the next unconsumed Dc
    /// slot in linear order. A gene may contain more constant-terminal
    /// occurrences than it has Dc slots; the surplus renders as `C?`, which
    /// is a display case, not an error.
    pub fn to_karva_string(&self, set: &SymbolSet) -> String {
        let mut out = String::new();
        for (index, gene) in self.genes.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            let dc = self.dc.as_ref().map(|dc| &dc[index]);
            let mut next_dc = 0usize;
            let glyphs: Vec<String> = gene
                .iter()
                .map(|&id| match &set.symbol(id).kind {
                    SymbolKind::ConstantTerminal => match dc.and_then(|dc| dc.get(next_dc)) {
                        Some(slot) => {
                            next_dc += 1;
                            format!("C{slot}")
                        }
                        None => {
                            log::debug!("gene {index} ran out of Dc slots while rendering");
                            "C?".to_string()
                        }
                    },
                    _ => set.symbol(id).name.clone(),
                })
                .collect();
            out.push_str(&glyphs.join("."));
        }
        if let Some(constants) = &self.constants {
            for (index, pool) in constants.iter().enumerate() {
                out.push_str(&format!("\nconstants[{index}]: {pool:?}"));
            }
        }
        out
    }

    /// Render the full decoded expression, chaining multi-gene results
    /// through the linking function's own rendering rule.
    pub fn to_math_string(&mut self, set: &SymbolSet) -> Result<String> {
        let linking = self.linking();
        let mut rendered = self.parsed_gene(0, set)?.to_math_string(set);
        for gene in 1..self.num_genes() {
            let next = self.parsed_gene(gene, set)?.to_math_string(set);
            rendered = linking.render(&[rendered, next]);
        }
        Ok(rendered)
    }
}

fn expect_i32(text: &str, position: usize) -> Result<(i32, usize)> {
    match codec::decode(text, position)? {
        (Token::I32(value), next) => Ok((value, next)),
        (other, _) => Err(KarvaError::Genotype(format!(
            "expected an int token at position {position}, found {other:?}"
        ))),
    }
}

fn expect_f64(text: &str, position: usize) -> Result<(f64, usize)> {
    match codec::decode(text, position)? {
        (Token::F64(value), next) => Ok((value, next)),
        (other, _) => Err(KarvaError::Genotype(format!(
            "expected a double token at position {position}, found {other:?}"
        ))),
    }
}

fn non_negative(value: i32) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| KarvaError::Genotype(format!("negative index {value} in genotype")))
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32> {
    let end = *cursor + 4;
    let slice = bytes
        .get(*cursor..end)
        .ok_or_else(|| KarvaError::Genotype("truncated binary genotype".to_string()))?;
    *cursor = end;
    Ok(u32::from_be_bytes(slice.try_into().expect("4-byte slice")))
}

fn read_u64(bytes: &[u8], cursor: &mut usize) -> Result<u64> {
    let end = *cursor + 8;
    let slice = bytes
        .get(*cursor..end)
        .ok_or_else(|| KarvaError::Genotype("truncated binary genotype".to_string()))?;
    *cursor = end;
    Ok(u64::from_be_bytes(slice.try_into().expect("8-byte slice")))
}
